use anyhow::Result;
use noisy_float::prelude::*;
use std::path::{Path, PathBuf};
use tiny_yolo::Config;

lazy_static::lazy_static! {
    static ref CONFIG_DIR: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("cfg");
    static ref CONFIG_FILE: PathBuf = CONFIG_DIR.join("tiny-yolo.json5");
}

#[test]
fn load_config_test() -> Result<()> {
    let config = Config::open(&*CONFIG_FILE)?;
    assert_eq!(config.image_size, 416);
    assert_eq!(config.num_classes, 80);
    assert_eq!(config.anchors.len(), 6);
    assert_eq!(config.categories.paper_names_file, CONFIG_DIR.join("coco-paper.names"));

    let layout = config.grid_layout()?;
    assert_eq!(layout.num_predictions(), 26 * 26 * 3 + 13 * 13 * 3);

    let _yolo_loss = config.yolo_loss_init()?.build()?;
    Ok(())
}

#[test]
fn invalid_config_test() -> Result<()> {
    let config = Config::open(&*CONFIG_FILE)?;

    let invalid_configs: Vec<(&str, Box<dyn Fn(&mut Config)>)> = vec![
        (
            "anchors not grouped by 3",
            Box::new(|config| {
                config.anchors.pop();
            }),
        ),
        (
            "image size not divisible by the coarsest stride",
            Box::new(|config| config.image_size = 400),
        ),
        (
            "ignore threshold out of range",
            Box::new(|config| config.ignore_thresh = r64(1.0)),
        ),
        (
            "zero no-object coefficient",
            Box::new(|config| config.no_object_coeff = r64(0.0)),
        ),
        (
            "zero coordinate coefficient",
            Box::new(|config| config.coord_coeff = r64(0.0)),
        ),
        (
            "flip probability out of range",
            Box::new(|config| config.preprocessor.horizontal_flip_prob = r64(1.5)),
        ),
        (
            "negative anchor",
            Box::new(|config| config.anchors[0] = [r64(-10.0), r64(14.0)]),
        ),
        ("no classes", Box::new(|config| config.num_classes = 0)),
    ];

    invalid_configs.into_iter().for_each(|(name, modify)| {
        let mut config = config.clone();
        modify(&mut config);
        assert!(config.validate().is_err(), "'{}' is accepted", name);
    });

    Ok(())
}

#[test]
fn category_map_test() -> Result<()> {
    let config = Config::open(&*CONFIG_FILE)?;
    let map = config.load_category_map()?;

    assert_eq!(map.num_classes(), 80);
    assert_eq!(map.class_of_category_id(1), Some(0));
    assert_eq!(map.class_name(0), Some("person"));
    // street sign
    assert_eq!(map.class_of_category_id(12), None);
    assert_eq!(map.class_of_category_id(13), Some(11));
    assert_eq!(map.class_of_category_id(90), Some(79));
    assert_eq!(map.class_name(79), Some("toothbrush"));
    // hair brush
    assert_eq!(map.class_of_category_id(91), None);
    assert_eq!(map.class_of_category_id(92), None);
    Ok(())
}

#[test]
fn mismatched_num_classes_test() -> Result<()> {
    let mut config = Config::open(&*CONFIG_FILE)?;
    config.num_classes = 79;
    assert!(config.load_category_map().is_err());
    Ok(())
}
