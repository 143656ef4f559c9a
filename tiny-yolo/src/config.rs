//! Training configuration format.

use crate::{
    common::*,
    dataset::{CategoryMap, SampleBuilder, SampleBuilderInit},
    loss::{GridLayout, GridLayoutInit, YoloLossInit},
    processor::{prepare_for_inference, prepare_for_training, Compose},
};

pub use categories::*;
pub use preprocessor::*;

/// The main configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// The side length of the square network input in pixels.
    pub image_size: usize,
    pub num_classes: usize,
    /// The label capacity per image.
    pub max_num_boxes: usize,
    /// Anchor `[w, h]` pairs in pixels, grouped by 3 from the finest scale to the coarsest.
    pub anchors: Vec<[R64; 2]>,
    /// The stride of the finest scale.
    #[serde(default = "default_finest_stride")]
    pub finest_stride: usize,
    /// Predictions overlapping a target by at least this IoU are left out of the no-object loss.
    pub ignore_thresh: R64,
    pub no_object_coeff: R64,
    pub coord_coeff: R64,
    pub categories: CategoriesConfig,
    #[serde(default)]
    pub preprocessor: PreprocessorConfig,
}

impl Config {
    /// Load and validate a JSON5 configuration file.
    ///
    /// Relative names file paths are resolved against the directory of the file.
    pub fn open<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("unable to read '{}'", path.display()))?;
        let mut config: Self = json5::from_str(&text)
            .with_context(|| format!("unable to parse '{}'", path.display()))?;

        if let Some(base_dir) = path.parent() {
            config.categories.resolve_paths(base_dir);
        }

        config
            .validate()
            .with_context(|| format!("invalid configuration '{}'", path.display()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let Self {
            num_classes,
            max_num_boxes,
            ignore_thresh,
            no_object_coeff,
            coord_coeff,
            ref preprocessor,
            ..
        } = *self;

        ensure!(num_classes > 0, "num_classes must be positive");
        ensure!(max_num_boxes > 0, "max_num_boxes must be positive");
        ensure!(
            ignore_thresh >= 0.0 && ignore_thresh < 1.0,
            "ignore_thresh must be in range [0, 1), but get {}",
            ignore_thresh
        );
        ensure!(
            no_object_coeff > 0.0,
            "no_object_coeff must be positive, but get {}",
            no_object_coeff
        );
        ensure!(
            coord_coeff > 0.0,
            "coord_coeff must be positive, but get {}",
            coord_coeff
        );
        preprocessor.validate()?;

        let layout = self.grid_layout()?;
        debug!(
            "{} anchors on {} scales, {} predictions per image",
            layout.num_anchors(),
            layout.scales().len(),
            layout.num_predictions()
        );
        Ok(())
    }

    pub fn grid_layout(&self) -> Result<GridLayout> {
        GridLayoutInit {
            image_size: self.image_size,
            finest_stride: self.finest_stride,
            anchors: self
                .anchors
                .iter()
                .map(|&[w, h]| [w.raw(), h.raw()])
                .collect(),
        }
        .build()
    }

    pub fn yolo_loss_init(&self) -> Result<YoloLossInit> {
        Ok(YoloLossInit {
            layout: self.grid_layout()?,
            num_classes: self.num_classes,
            ignore_thresh: self.ignore_thresh.raw(),
            no_object_coeff: self.no_object_coeff.raw(),
            coord_coeff: self.coord_coeff.raw(),
        })
    }

    /// Load the category map and check it agrees with `num_classes`.
    pub fn load_category_map(&self) -> Result<CategoryMap> {
        let CategoriesConfig {
            paper_names_file,
            dataset_names_file,
        } = &self.categories;
        let map = CategoryMap::load(paper_names_file, dataset_names_file)?;
        ensure!(
            map.num_classes() == self.num_classes,
            "num_classes is {}, but '{}' lists {} classes",
            self.num_classes,
            dataset_names_file.display(),
            map.num_classes()
        );
        Ok(map)
    }

    /// Build a sample builder with the augmenting or the deterministic pipeline.
    pub fn sample_builder(&self, training: bool) -> Result<SampleBuilder<Compose>> {
        let pipeline = if training {
            prepare_for_training(self.image_size, &self.preprocessor)?
        } else {
            prepare_for_inference(self.image_size, self.preprocessor.fill_value.raw())?
        };

        SampleBuilderInit {
            max_num_boxes: self.max_num_boxes,
            category_map: self.load_category_map()?,
            pipeline,
        }
        .build()
    }
}

fn default_finest_stride() -> usize {
    16
}

mod categories {
    use super::*;

    /// The pair of category names files.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct CategoriesConfig {
        /// Every category name of the COCO paper, one per line, in paper order.
        pub paper_names_file: PathBuf,
        /// The trained category names, one per line, in class index order.
        pub dataset_names_file: PathBuf,
    }

    impl CategoriesConfig {
        pub(super) fn resolve_paths(&mut self, base_dir: &Path) {
            [&mut self.paper_names_file, &mut self.dataset_names_file]
                .into_iter()
                .filter(|path| path.is_relative())
                .for_each(|path| *path = base_dir.join(&*path));
        }
    }
}

mod preprocessor {
    use super::*;

    /// Data augmentation options.
    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct PreprocessorConfig {
        /// The padding value of squared images, in the float pixel range [0, 1].
        #[serde(default = "default_fill_value")]
        pub fill_value: R64,
        /// The maximum random hue shift in turns.
        pub hue_shift: Option<R64>,
        pub saturation_shift: Option<R64>,
        pub value_shift: Option<R64>,
        /// The maximum random deviation of the contrast factor from 1.
        pub contrast_shift: Option<R64>,
        #[serde(default = "default_flip_prob")]
        pub horizontal_flip_prob: R64,
        #[serde(default = "default_flip_prob")]
        pub vertical_flip_prob: R64,
    }

    impl PreprocessorConfig {
        pub fn validate(&self) -> Result<()> {
            let Self {
                fill_value,
                hue_shift,
                saturation_shift,
                value_shift,
                contrast_shift,
                horizontal_flip_prob,
                vertical_flip_prob,
            } = *self;

            ensure!(
                (0.0..=1.0).contains(&fill_value.raw()),
                "fill_value must be in range [0, 1], but get {}",
                fill_value
            );
            [
                ("hue_shift", hue_shift),
                ("saturation_shift", saturation_shift),
                ("value_shift", value_shift),
                ("contrast_shift", contrast_shift),
            ]
            .into_iter()
            .try_for_each(|(name, shift)| {
                if let Some(shift) = shift {
                    ensure!(shift >= 0.0, "{} must be non-negative", name);
                }
                Ok(())
            })?;
            [
                ("horizontal_flip_prob", horizontal_flip_prob),
                ("vertical_flip_prob", vertical_flip_prob),
            ]
            .into_iter()
            .try_for_each(|(name, prob)| {
                ensure!(
                    (0.0..=1.0).contains(&prob.raw()),
                    "{} must be in range [0, 1], but get {}",
                    name,
                    prob
                );
                Ok(())
            })?;
            Ok(())
        }
    }

    impl Default for PreprocessorConfig {
        fn default() -> Self {
            Self {
                fill_value: default_fill_value(),
                hue_shift: None,
                saturation_shift: None,
                value_shift: None,
                contrast_shift: None,
                horizontal_flip_prob: default_flip_prob(),
                vertical_flip_prob: default_flip_prob(),
            }
        }
    }

    fn default_fill_value() -> R64 {
        r64(0.5)
    }

    fn default_flip_prob() -> R64 {
        r64(0.5)
    }
}
