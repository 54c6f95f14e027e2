//! Verify build/parse methods against JSON test vectors stored in `test-vectors/`.
//!
//! Each vector file describes inputs, expected requests, simulated responses,
//! and expected parse results or errors. Comparing parsed JSON (not raw
//! strings) avoids false negatives from field-ordering differences.

use serde_json::Value;
use todo_core::{ApiError, HttpMethod, HttpRequest, HttpResponse, NewTodo, Todo, TodoClient};

const BASE_URL: &str = "http://localhost:3000";

fn client() -> TodoClient {
    TodoClient::new(BASE_URL)
}

fn parse_method(s: &str) -> HttpMethod {
    match s {
        "GET" => HttpMethod::Get,
        "POST" => HttpMethod::Post,
        "PUT" => HttpMethod::Put,
        "DELETE" => HttpMethod::Delete,
        other => panic!("unknown method: {other}"),
    }
}

fn cases(raw: &str) -> Vec<Value> {
    let vectors: Value = serde_json::from_str(raw).unwrap();
    vectors["cases"].as_array().unwrap().clone()
}

/// Compare method, url, headers and (when present) JSON body.
fn assert_request(name: &str, req: &HttpRequest, expected: &Value) {
    assert_eq!(req.method, parse_method(expected["method"].as_str().unwrap()), "{name}: method");
    assert_eq!(req.url, format!("{BASE_URL}{}", expected["path"].as_str().unwrap()), "{name}: url");

    let expected_headers: Vec<(String, String)> = expected["headers"]
        .as_array()
        .unwrap()
        .iter()
        .map(|h| {
            let arr = h.as_array().unwrap();
            (arr[0].as_str().unwrap().to_string(), arr[1].as_str().unwrap().to_string())
        })
        .collect();
    assert_eq!(req.headers, expected_headers, "{name}: headers");

    match expected.get("body") {
        Some(body) => {
            let req_body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
            assert_eq!(&req_body, body, "{name}: body");
        }
        None => assert!(req.body.is_none(), "{name}: body should be None"),
    }
}

fn simulated(case: &Value) -> HttpResponse {
    let sim = &case["simulated_response"];
    HttpResponse::new(sim["status"].as_u64().unwrap() as u16, sim["body"].as_str().unwrap())
}

fn assert_error(name: &str, err: ApiError, expected: &Value) {
    match expected.as_str().unwrap() {
        "NotFound" => assert!(matches!(err, ApiError::NotFound), "{name}: expected NotFound, got {err:?}"),
        "HttpError" => assert!(matches!(err, ApiError::HttpError { .. }), "{name}: expected HttpError, got {err:?}"),
        "DeserializationError" => assert!(
            matches!(err, ApiError::DeserializationError(_)),
            "{name}: expected DeserializationError, got {err:?}"
        ),
        other => panic!("{name}: unknown expected_error: {other}"),
    }
}

/// Check a parse result against `expected_result` or `expected_error`.
fn assert_outcome<T>(name: &str, case: &Value, result: Result<T, ApiError>)
where
    T: PartialEq + std::fmt::Debug + serde::de::DeserializeOwned,
{
    if let Some(expected_error) = case.get("expected_error") {
        assert_error(name, result.unwrap_err(), expected_error);
    } else {
        let expected: T = serde_json::from_value(case["expected_result"].clone()).unwrap();
        assert_eq!(result.unwrap(), expected, "{name}: parsed result");
    }
}

#[test]
fn fetch_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/fetch.json")) {
        let name = case["name"].as_str().unwrap();
        assert_request(name, &c.build_fetch_todos(), &case["expected_request"]);
        assert_outcome::<Vec<Todo>>(name, &case, c.parse_fetch_todos(simulated(&case)));
    }
}

#[test]
fn write_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/write.json")) {
        let name = case["name"].as_str().unwrap();
        let input: NewTodo = serde_json::from_value(case["input"].clone()).unwrap();
        assert_request(name, &c.build_write_todo(&input).unwrap(), &case["expected_request"]);
        assert_outcome::<Todo>(name, &case, c.parse_write_todo(simulated(&case)));
    }
}

#[test]
fn update_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/update.json")) {
        let name = case["name"].as_str().unwrap();
        let input: Todo = serde_json::from_value(case["input"].clone()).unwrap();
        assert_request(name, &c.build_update_todo(&input), &case["expected_request"]);
        assert_outcome::<Todo>(name, &case, c.parse_update_todo(simulated(&case)));
    }
}

#[test]
fn delete_test_vectors() {
    let c = client();
    for case in cases(include_str!("../../test-vectors/delete.json")) {
        let name = case["name"].as_str().unwrap();
        let id = case["input_id"].as_str().unwrap();
        assert_request(name, &c.build_delete_todo(id), &case["expected_request"]);
        assert_outcome::<String>(name, &case, c.parse_delete_todo(simulated(&case)));
    }
}
