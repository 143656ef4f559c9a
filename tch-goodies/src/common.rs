pub use anyhow::{bail, ensure, format_err, Result};
pub use tch::{Device, Kind, Tensor};
