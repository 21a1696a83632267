pub mod alert_record;
pub mod alert_store;
pub mod canvas;
pub mod detection;
pub mod palette;
pub mod risk_model;
pub mod video_catalog;
pub mod zone_summary;
