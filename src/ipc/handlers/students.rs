use crate::ipc::helpers::{
    get_optional_str, get_str_list, lookup_student, parse_new_student, resolve_student, respond,
    to_json, HandlerErr,
};
use crate::ipc::types::{AppState, Request};
use crate::store::Store;
use crate::views;
use serde_json::json;

fn students_list(store: &Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let keywords = get_str_list(params, "keywords")?;
    let tutorial = get_optional_str(params, "tutorial");
    let students = views::find_students(store, &keywords, tutorial.as_deref());
    to_json(&students).map(|v| json!({ "students": v }))
}

fn students_get(store: &Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let student = lookup_student(store, params)?;
    to_json(&views::student_view(store, student)).map(|v| json!({ "student": v }))
}

fn students_create(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let new = parse_new_student(params)?;
    let requested = new.tutorials.len();
    let student = store.add_student(new)?;
    let view = views::student_view(store, &student);
    // Unknown tutorials were dropped; report how many so callers can tell.
    Ok(json!({
        "studentId": student.id,
        "student": to_json(&view)?,
        "droppedTutorials": requested.saturating_sub(view.tutorials.len()),
    }))
}

fn students_update(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let current = lookup_student(store, params)?;
    let id = current.id;
    let Some(patch) = params.get("patch") else {
        return Err(HandlerErr::bad_params("missing patch"));
    };

    // Fields absent from the patch keep their current value.
    let mut merged = to_json(&views::student_view(store, current))?;
    if let (Some(target), Some(fields)) = (merged.as_object_mut(), patch.as_object()) {
        for (k, v) in fields {
            target.insert(k.clone(), v.clone());
        }
    }
    let edit = parse_new_student(&merged)?;
    let student = store.set_student(id, edit)?;
    to_json(&views::student_view(store, &student)).map(|v| json!({ "student": v }))
}

fn students_delete(store: &mut Store, params: &serde_json::Value) -> Result<serde_json::Value, HandlerErr> {
    let id = resolve_student(store, params)?;
    let student = store.remove_student(id)?;
    Ok(json!({ "studentId": student.id, "name": student.name }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    let store = &mut state.store;
    let result = match req.method.as_str() {
        "students.list" => students_list(store, &req.params),
        "students.get" => students_get(store, &req.params),
        "students.create" => students_create(store, &req.params),
        "students.update" => students_update(store, &req.params),
        "students.delete" => students_delete(store, &req.params),
        _ => return None,
    };
    Some(respond(&req.id, result))
}
