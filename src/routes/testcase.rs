use std::collections::BTreeMap;
use std::sync::Arc;

use actix_web::{post, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::helpers::JsonResponse;
use crate::mcp::{CallToolResponse, McpDispatcher, TestCase, TestCaseError, TestCaseStore};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveTestCaseRequest {
    pub tool_name: String,
    pub test_case_number: i64,
    #[serde(default)]
    pub input: Option<BTreeMap<String, Value>>,
    pub response: CallToolResponse,
}

#[derive(Debug, Serialize)]
pub struct SavedTestCase {
    pub file: String,
}

#[tracing::instrument(
    name = "Save test case",
    skip(dispatcher, form),
    fields(tool = %form.tool_name, number = form.test_case_number)
)]
#[post("/testcase/save")]
pub async fn save_handler(
    dispatcher: web::Data<Arc<McpDispatcher>>,
    form: web::Json<SaveTestCaseRequest>,
) -> HttpResponse {
    let form = form.into_inner();

    if !dispatcher.registry().has_tool(&form.tool_name).await {
        return JsonResponse::<()>::not_valid(&format!("Tool not found: {}", form.tool_name))
            .into_response();
    }
    let number = match u32::try_from(form.test_case_number) {
        Ok(number) => number,
        Err(_) => {
            return JsonResponse::<()>::not_valid(&format!(
                "Invalid test case number: {}",
                form.test_case_number
            ))
            .into_response()
        }
    };

    let store = dispatcher.testcases().clone();
    let tool = form.tool_name.clone();
    let test_case = TestCase {
        input: form.input.unwrap_or_default(),
        response: form.response,
    };
    let saved = web::block(move || store.save(&tool, number, &test_case)).await;

    match saved {
        Ok(Ok(_)) => {
            let file = TestCaseStore::file_name(&form.tool_name, number);
            JsonResponse::ok(
                &format!("Test case saved: {}", file),
                Some(SavedTestCase { file }),
            )
            .into_response()
        }
        Ok(Err(err @ TestCaseError::InvalidNumber { .. })) => {
            JsonResponse::<()>::not_valid(&err.to_string()).into_response()
        }
        Ok(Err(err)) => {
            tracing::error!("Failed to save test case: {}", err);
            JsonResponse::<()>::internal_error(&format!("Failed to save test case: {}", err))
                .into_response()
        }
        Err(err) => {
            tracing::error!("Save task failed: {}", err);
            JsonResponse::<()>::internal_error("").into_response()
        }
    }
}
