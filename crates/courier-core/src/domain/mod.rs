pub mod errors;
pub mod ids;
pub mod keys;
pub mod params;
pub mod work_item;

pub use errors::{CourierError, CourierResult};
pub use ids::ItemId;
pub use params::{
    format_with, DateFormat, DateTimeFormat, ParamBag, ParamFormat, TaskParams,
    TaskParamsBuilder, DATE_FORMAT, DATE_TIME_FORMAT,
};
pub use work_item::{Schedule, WorkItem};
