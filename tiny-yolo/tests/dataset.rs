use anyhow::Result;
use approx::assert_abs_diff_eq;
use rand::prelude::*;
use std::path::{Path, PathBuf};
use tch::{Device, IndexOp, Kind, Tensor};
use tiny_yolo::{
    dataset::{Annotation, Batch},
    Config,
};

lazy_static::lazy_static! {
    static ref CONFIG_FILE: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("cfg")
        .join("tiny-yolo.json5");
}

fn image(height: i64, width: i64) -> Tensor {
    Tensor::zeros(&[3, height, width], (Kind::Uint8, Device::Cpu))
}

fn annotation(bbox: [f64; 4], category_id: usize) -> Annotation {
    Annotation { bbox, category_id }
}

#[test]
fn inference_sample_test() -> Result<()> {
    let config = Config::open(&*CONFIG_FILE)?;
    let builder = config.sample_builder(false)?;
    let mut rng = StdRng::seed_from_u64(0);

    let annotations = [
        annotation([100.0, 50.0, 200.0, 150.0], 1),
        // street sign is not trained
        annotation([10.0, 10.0, 20.0, 20.0], 12),
        annotation([0.0, 0.0, 640.0, 480.0], 90),
    ];
    let sample = builder.build(image(480, 640), &annotations, &mut rng)?;

    assert_eq!(sample.image.size(), [3, 416, 416]);
    assert_eq!(sample.image.kind(), Kind::Float);
    assert_eq!(sample.labels.size(), [100, 85]);
    assert_eq!(sample.num_boxes, 2);

    let first = Vec::<f32>::from(&sample.labels.i(0));
    [65.0, 84.5, 195.0, 182.0]
        .iter()
        .zip(&first[0..4])
        .for_each(|(&expect, &value)| assert_abs_diff_eq!(expect, value, epsilon = 1e-3));
    assert_eq!(first[4], 1.0);
    assert_eq!(first[5], 1.0);
    assert_eq!(first[5..].iter().sum::<f32>(), 1.0);

    // toothbrush covering the whole image
    let second = Vec::<f32>::from(&sample.labels.i(1));
    [0.0, 52.0, 416.0, 364.0]
        .iter()
        .zip(&second[0..4])
        .for_each(|(&expect, &value)| assert_abs_diff_eq!(expect, value, epsilon = 1e-3));
    assert_eq!(second[5 + 79], 1.0);

    // padding rows are zeros
    assert_eq!(sample.labels.i(2..).abs().sum(Kind::Double).double_value(&[]), 0.0);
    Ok(())
}

#[test]
fn truncation_test() -> Result<()> {
    let mut config = Config::open(&*CONFIG_FILE)?;
    config.max_num_boxes = 2;
    let builder = config.sample_builder(false)?;
    let mut rng = StdRng::seed_from_u64(0);

    let annotations: Vec<_> = (0..5)
        .map(|index| annotation([index as f64 * 10.0, 0.0, 8.0, 8.0], 1))
        .collect();
    let sample = builder.build(image(416, 416), &annotations, &mut rng)?;

    assert_eq!(sample.labels.size(), [2, 85]);
    assert_eq!(sample.num_boxes, 2);
    assert_abs_diff_eq!(sample.labels.double_value(&[1, 0]), 10.0, epsilon = 1e-6);
    Ok(())
}

#[test]
fn training_batch_test() -> Result<()> {
    let config = Config::open(&*CONFIG_FILE)?;
    let builder = config.sample_builder(true)?;
    let yolo_loss = config.yolo_loss_init()?.build()?;
    let mut rng = StdRng::seed_from_u64(7);

    let samples = vec![
        builder.build(
            image(480, 640),
            &[
                annotation([100.0, 50.0, 200.0, 150.0], 1),
                annotation([300.0, 200.0, 50.0, 80.0], 3),
            ],
            &mut rng,
        )?,
        builder.build(image(300, 200), &[], &mut rng)?,
    ];
    let batch = Batch::collate(samples)?;

    assert_eq!(batch.batch_size(), 2);
    assert_eq!(batch.images.size(), [2, 3, 416, 416]);
    assert_eq!(Vec::<i64>::from(&batch.num_boxes), vec![2, 0]);

    // every transformed box stays inside the image
    let boxes = batch.labels.i((0, 0..2, 0..4));
    assert!(bool::from(boxes.ge(0.0).all()));
    assert!(bool::from(boxes.le(416.0).all()));

    let num_predictions = yolo_loss.layout().num_predictions();
    let prediction = Tensor::randn(&[2, num_predictions, 85], (Kind::Float, Device::Cpu));
    let (output, aux) = yolo_loss.forward(&prediction, &batch.labels, &batch.num_boxes)?;

    assert_eq!(aux.targets.num_targets(), 2);
    assert!(output.values().iter().all(|value| value.is_finite()));
    Ok(())
}
