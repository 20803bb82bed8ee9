//! HTML pages for the index table and the update form.

use std::collections::BTreeSet;
use std::fmt::Write;

use crate::output::format_metric;
use crate::record::{Metric, Record};

/// Escapes text for HTML element and attribute content.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

fn page(title: &str, body: &str) -> String {
    format!(
        concat!(
            "<!DOCTYPE html>\n<html>\n",
            "<head><meta charset=\"utf-8\"><title>{}</title></head>\n",
            "<body>\n{}</body>\n</html>\n",
        ),
        escape(title),
        body
    )
}

/// The records table, titled with the course filter when there is one.
pub fn index_page(course: Option<&str>, records: &[Record]) -> String {
    let mut body = String::new();
    let heading = match course {
        Some(c) => format!("Admissions statistics: {}", escape(c)),
        None => "Admissions statistics".to_string(),
    };
    let _ = writeln!(body, "<h1>{heading}</h1>");
    body.push_str("<p><a href=\"/update\">Submit your profile</a></p>\n");

    if records.is_empty() {
        body.push_str("<p>No records found.</p>\n");
        return page("Admissions statistics", &body);
    }

    body.push_str("<table>\n<tr><th>University</th><th>Course</th>");
    for m in Metric::ALL {
        let _ = write!(body, "<th>{}</th>", m.label());
    }
    body.push_str("</tr>\n");

    for r in records {
        let _ = write!(
            body,
            "<tr><td>{}</td><td>{}</td>",
            escape(&r.university),
            escape(&r.course)
        );
        for m in Metric::ALL {
            let _ = write!(body, "<td>{}</td>", format_metric(r.metric(m)));
        }
        body.push_str("</tr>\n");
    }
    body.push_str("</table>\n");

    page("Admissions statistics", &body)
}

fn datalist(id: &str, options: &BTreeSet<String>) -> String {
    let mut out = format!("<datalist id=\"{id}\">");
    for o in options {
        let _ = write!(out, "<option value=\"{}\">", escape(o));
    }
    out.push_str("</datalist>\n");
    out
}

/// The submission form, with known universities and courses as suggestions.
pub fn update_page(universities: &BTreeSet<String>, courses: &BTreeSet<String>) -> String {
    let mut body = String::from("<h1>Submit your profile</h1>\n");
    body.push_str("<form method=\"post\" action=\"/update\">\n");

    body.push_str(
        "<label>University \
         <input name=\"university\" list=\"universities\" required></label><br>\n",
    );
    body.push_str(&datalist("universities", universities));
    body.push_str("<label>Course <input name=\"course\" list=\"courses\" required></label><br>\n");
    body.push_str(&datalist("courses", courses));

    for m in Metric::ALL {
        let required = if m.is_required() { " required" } else { "" };
        let _ = writeln!(
            body,
            "<label>{} <input name=\"{}\" type=\"number\" step=\"any\"{}></label><br>",
            m.label(),
            m.key(),
            required
        );
    }
    body.push_str("<button type=\"submit\">Submit</button>\n</form>\n");

    page("Submit your profile", &body)
}
