//! services/client/src/adapters/endpoints.rs
//!
//! Relative paths of every backend endpoint, joined onto the configured base.

pub const LOGIN: &str = "user/login/";
pub const SIGN_UP: &str = "user/user-sign-up/";
pub const LOGOUT: &str = "user/logout/";
pub const REFRESH_TOKEN: &str = "user/refresh/";

pub const FILE_UPLOAD: &str = "filesearch/upload/";
pub const FILE_QUERY: &str = "filesearch/query/";
pub const FILE_STORES_LIST: &str = "filesearch/stores/list/";
pub const FILE_STORES_LIST_FILTER: &str = "filesearch/stores/list-filter/";

pub const PERSONALIZATION_PREFERENCES: &str = "personalization/preferences/";

pub const EVALUATION_RAGAS: &str = "evaluation/ragas/";
pub const EVALUATION_METRICS: &str = "evaluation/metrics/";

pub const ADMIN_STORES: &str = "admin/stores/";
pub const ADMIN_METRICS: &str = "admin/metrics/";
pub const ADMIN_USERS: &str = "admin/users/";
