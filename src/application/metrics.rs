//! Metric keys emitted by the authoring core.

pub const METRIC_POST_SAVES: &str = "folio_post_saves_total";
pub const METRIC_ADMIN_DENIALS: &str = "folio_admin_denials_total";
pub const METRIC_IMAGE_UPLOADS: &str = "folio_image_uploads_total";
