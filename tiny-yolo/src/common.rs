pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use bbox::{prelude::*, SquarePadding, Transform, HW, TLBR};
pub use indexmap::IndexSet;
pub use itertools::Itertools as _;
pub use label::PixelLabel;
pub use log::{debug, info, warn};
pub use noisy_float::prelude::*;
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    collections::HashMap,
    fmt::Debug,
    path::{Path, PathBuf},
};
pub use tch::{Device, IndexOp, Kind, Reduction, Tensor};
pub use tch_goodies::{BoxFormat, IouMode, TensorExt as _, EPSILON};
pub use tch_tensor_like::TensorLike;

unzip_n::unzip_n!(pub 3);
