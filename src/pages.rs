use crate::models::{Prediction, RawInput};

const FIELDS: [(&str, &str); 7] = [
    ("LIMIT_BAL", "Credit limit"),
    ("SEX", "Sex (1 = male, 2 = female)"),
    ("EDUCATION", "Education (1-4)"),
    ("MARRIAGE", "Marriage (1-3)"),
    ("AGE", "Age"),
    ("TOTAL_BILL_AMT", "Total bill amount (6 months)"),
    ("TOTAL_PAY_AMT", "Total payment amount (6 months)"),
];

/// Render the scoring page: the input form with the submitted values echoed
/// back, plus at most one of a prediction block or an error block.
pub fn scoring_page(
    input: &RawInput,
    prediction: Option<&Prediction>,
    error: Option<&str>,
) -> String {
    let mut page = String::with_capacity(2048);
    page.push_str(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n\
         <title>Credit Default Predictor</title>\n\
         <link rel=\"stylesheet\" href=\"/static/style.css\">\n\
         </head>\n<body>\n<h1>Credit Default Prediction</h1>\n",
    );

    page.push_str("<form method=\"post\" action=\"/predict\">\n");
    for (name, label) in FIELDS {
        let value = field_value(input, name);
        page.push_str(&format!(
            "<label for=\"{name}\">{label}</label>\n\
             <input type=\"text\" id=\"{name}\" name=\"{name}\" value=\"{}\">\n",
            escape(value)
        ));
    }
    page.push_str("<button type=\"submit\">Predict</button>\n</form>\n");

    if let Some(prediction) = prediction {
        page.push_str(&format!(
            "<div class=\"result\">\n<p>Prediction: <strong>{}</strong></p>\n\
             <p>Probability of default: <strong>{:.3}</strong></p>\n</div>\n",
            prediction.outcome.as_str(),
            prediction.probability
        ));
    } else if let Some(message) = error {
        page.push_str(&format!(
            "<div class=\"error\"><p>{}</p></div>\n",
            escape(message)
        ));
    }

    page.push_str("</body>\n</html>\n");
    page
}

fn field_value<'a>(input: &'a RawInput, name: &str) -> &'a str {
    let slot = match name {
        "LIMIT_BAL" => &input.limit_bal,
        "SEX" => &input.sex,
        "EDUCATION" => &input.education,
        "MARRIAGE" => &input.marriage,
        "AGE" => &input.age,
        "TOTAL_BILL_AMT" => &input.total_bill_amt,
        "TOTAL_PAY_AMT" => &input.total_pay_amt,
        _ => &None,
    };
    slot.as_deref().unwrap_or("")
}

/// Minimal HTML escaping for untrusted field values.
fn escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
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
