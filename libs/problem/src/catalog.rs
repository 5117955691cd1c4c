use axum::http::StatusCode;

use crate::Problem;

/// Static error definition; modules declare their catalog as `const ErrDef` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrDef {
    pub status: u16,
    pub title: &'static str,
    pub code: &'static str,
    pub type_url: &'static str,
}

impl ErrDef {
    /// Build a Problem for one occurrence of this error.
    #[inline]
    pub fn to_problem(&self, detail: impl Into<String>) -> Problem {
        Problem::new(
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            self.title,
            detail,
        )
        .with_code(self.code)
        .with_type(self.type_url)
    }
}
