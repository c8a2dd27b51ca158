use crate::ipc::helpers::{get_required_str, resolve_student, respond, to_json, HandlerErr};
use crate::ipc::types::{AppState, Request};
use crate::model::SubmissionStatus;
use crate::store::Store;
use crate::views;
use serde_json::json;

fn submissions_list(store: &Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    let student = resolve_student(store, params)?;
    let rows = views::student_submissions(store, student, &tutorial)?;
    to_json(&rows).map(|v| json!({ "studentId": student, "submissions": v }))
}

fn submissions_set_status(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    let assignment = get_required_str(params, "assignment")?;
    let raw_status = get_required_str(params, "status")?;
    let status: SubmissionStatus = raw_status.parse().map_err(|message| HandlerErr {
        code: "bad_params",
        message,
        details: Some(json!({ "status": raw_status })),
    })?;
    let student = resolve_student(store, params)?;

    let submission = store.set_submission_status(&tutorial, &assignment, student, status)?;
    Ok(json!({
        "tutorial": tutorial,
        "assignment": assignment,
        "studentId": submission.student,
        "status": submission.status,
    }))
}

fn submissions_overview(store: &Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let tutorial = get_required_str(params, "tutorial")?;
    let assignment = get_required_str(params, "assignment")?;
    to_json(&views::assignment_overview(store, &tutorial, &assignment)?)
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = &mut state.store;
    let result = match req.method.as_str() {
        "submissions.list" => submissions_list(store, &req.params),
        "submissions.setStatus" => submissions_set_status(store, &req.params),
        "submissions.overview" => submissions_overview(store, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
