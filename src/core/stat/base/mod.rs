mod bucket_leap_array;
mod leap_array;
mod metric_bucket;
mod sliding_window_metric;

pub use bucket_leap_array::*;
pub use leap_array::*;
pub use metric_bucket::*;
pub use sliding_window_metric::*;
