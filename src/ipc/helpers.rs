use crate::error::StoreError;
use crate::ipc::error::{err, ok};
use crate::model::{NewStudent, Student, StudentId};
use crate::store::Store;
use chrono::NaiveDate;
use serde_json::json;

pub struct HandlerErr {
    pub code: &'static str,
    pub message: String,
    pub details: Option<serde_json::Value>,
}

impl HandlerErr {
    pub fn bad_params(message: impl Into<String>) -> Self {
        Self {
            code: "bad_params",
            message: message.into(),
            details: None,
        }
    }

    pub fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

impl From<StoreError> for HandlerErr {
    fn from(e: StoreError) -> Self {
        let details = match &e {
            StoreError::AmbiguousStudent { candidates, .. } => {
                Some(json!({ "candidates": candidates }))
            }
            _ => None,
        };
        Self {
            code: e.code(),
            message: e.to_string(),
            details,
        }
    }
}

pub fn respond(id: &str, result: Result<serde_json::Value, HandlerErr>) -> serde_json::Value {
    match result {
        Ok(v) => ok(id, v),
        Err(e) => e.response(id),
    }
}

pub fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, HandlerErr> {
    serde_json::to_value(value).map_err(|e| HandlerErr {
        code: "internal",
        message: e.to_string(),
        details: None,
    })
}

pub fn get_required_str(params: &serde_json::Value, key: &str) -> Result<String, HandlerErr> {
    let v = params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| HandlerErr::bad_params(format!("missing {}", key)))?;
    if v.is_empty() {
        return Err(HandlerErr::bad_params(format!("{} must not be empty", key)));
    }
    Ok(v)
}

pub fn get_optional_str(params: &serde_json::Value, key: &str) -> Option<String> {
    params
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .and_then(|s| if s.is_empty() { None } else { Some(s) })
}

pub fn get_str_list(params: &serde_json::Value, key: &str) -> Result<Vec<String>, HandlerErr> {
    let Some(v) = params.get(key) else {
        return Ok(Vec::new());
    };
    if v.is_null() {
        return Ok(Vec::new());
    }
    let Some(items) = v.as_array() else {
        return Err(HandlerErr::bad_params(format!("{} must be an array of strings", key)));
    };
    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(|s| s.trim().to_string())
                .ok_or_else(|| HandlerErr::bad_params(format!("{} must be an array of strings", key)))
        })
        .collect()
}

pub fn get_optional_date(params: &serde_json::Value, key: &str) -> Result<Option<NaiveDate>, HandlerErr> {
    let Some(raw) = get_optional_str(params, key) else {
        return Ok(None);
    };
    NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| HandlerErr {
            code: "bad_params",
            message: format!("{} must be YYYY-MM-DD", key),
            details: Some(json!({ "value": raw })),
        })
}

/// `studentId` wins; otherwise `student` is matched against any identity field
/// and must name exactly one student.
pub fn lookup_student<'a>(store: &'a Store, params: &serde_json::Value) -> Result<&'a Student, HandlerErr> {
    if let Some(raw) = get_optional_str(params, "studentId") {
        let id: StudentId = raw
            .parse()
            .map_err(|_| HandlerErr::bad_params("studentId must be a uuid"))?;
        return store
            .student(id)
            .ok_or_else(|| StoreError::StudentNotFound(raw).into());
    }
    let key = get_required_str(params, "student")
        .map_err(|_| HandlerErr::bad_params("missing studentId or student"))?;
    Ok(store.find_student_by_key(&key)?)
}

pub fn resolve_student(store: &Store, params: &serde_json::Value) -> Result<StudentId, HandlerErr> {
    lookup_student(store, params).map(|s| s.id)
}

pub fn parse_new_student(params: &serde_json::Value) -> Result<NewStudent, HandlerErr> {
    let name = get_required_str(params, "name")?;
    let student_no = get_required_str(params, "studentNo")?;
    let email = get_optional_str(params, "email");
    if let Some(e) = email.as_deref() {
        if !e.contains('@') {
            return Err(HandlerErr {
                code: "bad_params",
                message: "email must contain @".to_string(),
                details: Some(json!({ "email": e })),
            });
        }
    }
    Ok(NewStudent {
        name,
        student_no,
        phone: get_optional_str(params, "phone"),
        email,
        handle: get_optional_str(params, "handle"),
        tutorials: get_str_list(params, "tutorials")?,
    })
}
