//! `.http` reproduction output for failed cases

use crate::verdict::{Failure, RequestSnapshot};

/// Render failures as a `.http` file. URLs are rewritten to start with
/// `{{<base_url_var>}}` when they start with `base_url`.
#[must_use]
pub fn to_http_file(failures: &[Failure], base_url: &str, base_url_var: &str) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "# Reproduction cases ({} failures)",
        failures.len()
    ));
    lines.push(format!("@{base_url_var} = {base_url}"));
    lines.push(String::new());

    for (idx, failure) in failures.iter().enumerate() {
        let comment = format!(
            "[{idx}] {} - {} (status {})",
            failure.case,
            failure.kind().as_str(),
            failure.detail.actual_status
        );
        let mut request = failure.request.clone();
        if let Some(rest) = request.url.strip_prefix(base_url.trim_end_matches('/')) {
            request.url = format!("{{{{{base_url_var}}}}}{rest}");
        }
        lines.push(request_to_http(&request, Some(&comment)));
        lines.push(String::new());
    }

    lines.join("\n")
}

/// Render a single request.
#[must_use]
pub fn request_to_http(request: &RequestSnapshot, comment: Option<&str>) -> String {
    let mut lines = Vec::new();

    if let Some(c) = comment {
        lines.push(format!("### {c}"));
    }

    lines.push(format!("{} {}", request.method, request.url));

    for (key, value) in &request.headers {
        if !matches!(key.to_ascii_lowercase().as_str(), "host" | "content-length") {
            lines.push(format!("{key}: {value}"));
        }
    }

    if let Some(body) = &request.body {
        lines.push(String::new());
        lines.push(body.clone());
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{CaseIdentity, CaseOutcome, FaultDimension, FaultReason};
    use crate::response::ResponseBody;
    use crate::value::Value;
    use crate::verdict::{Expectation, FailureDetail, FailureKind};

    fn sample_failure() -> Failure {
        Failure {
            case: CaseIdentity {
                group: "crud".into(),
                method: "POST".into(),
                path_template: "/documents".into(),
                outcome: CaseOutcome::negative(
                    FaultReason::MissingRequiredHeader,
                    FaultDimension::Headers,
                    "X-Schema-ID",
                ),
            },
            detail: FailureDetail {
                kind: FailureKind::Assertion,
                expectation: Expectation::Deviation,
                expected_body: Value::Null,
                actual_status: 200,
                actual_body: ResponseBody::Empty,
                transport_error: None,
            },
            request: RequestSnapshot {
                method: "POST".into(),
                url: "http://localhost:8282/documents".into(),
                headers: vec![
                    ("Content-Type".into(), "application/json".into()),
                    ("Content-Length".into(), "13".into()),
                ],
                body: Some(r#"{"title":"a"}"#.into()),
            },
            vu: 0,
            iteration: 0,
        }
    }

    #[test]
    fn http_file_snapshot() {
        let output = to_http_file(&[sample_failure()], "http://localhost:8282/", "base_url");
        insta::assert_snapshot!(output.trim_end(), @r###"
        # Reproduction cases (1 failures)
        @base_url = http://localhost:8282/

        ### [0] [crud] POST /documents missing-required-header(X-Schema-ID) - assertion (status 200)
        POST {{base_url}}/documents
        Content-Type: application/json

        {"title":"a"}
        "###);
    }

    #[test]
    fn foreign_url_kept_verbatim() {
        let output = to_http_file(&[sample_failure()], "http://other:1", "base_url");
        assert!(output.contains("POST http://localhost:8282/documents"));
    }

    #[test]
    fn request_without_body() {
        let request = RequestSnapshot {
            method: "GET".into(),
            url: "http://localhost/api".into(),
            headers: Vec::new(),
            body: None,
        };
        let output = request_to_http(&request, Some("Test request"));
        assert_eq!(output, "### Test request\nGET http://localhost/api");
    }
}
