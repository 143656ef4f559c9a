use anyhow::{ensure, Result};
use clap::Parser;
use log::info;
use prettytable::{cell, row, Table};
use std::path::{Path, PathBuf};
use tch::{Device, Kind, Tensor};
use tch_goodies::IouMode;
use tiny_yolo::{loss::f_preprocess_targets, Config};

#[derive(Debug, Clone, Parser)]
enum Opts {
    /// Validate a configuration and print its prediction grid.
    Info {
        /// configuration file
        #[clap(long)]
        config: PathBuf,
    },
    /// Print the prediction slot a box is assigned to.
    Assign {
        /// configuration file
        #[clap(long)]
        config: PathBuf,
        /// box center x in pixels
        cx: f64,
        /// box center y in pixels
        cy: f64,
        /// box width in pixels
        w: f64,
        /// box height in pixels
        h: f64,
    },
}

fn main() -> Result<()> {
    if std::env::var_os("RUST_LOG").is_none() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Info { config } => {
            info(config)?;
        }
        Opts::Assign {
            config,
            cx,
            cy,
            w,
            h,
        } => {
            assign(config, [cx, cy, w, h])?;
        }
    }

    Ok(())
}

fn info(config_file: impl AsRef<Path>) -> Result<()> {
    let config = Config::open(config_file)?;
    let category_map = config.load_category_map()?;
    let layout = config.grid_layout()?;

    // print anchor information
    {
        let mut table = Table::new();
        table.add_row(row![
            "anchor",
            "size",
            "scale",
            "stride",
            "grid",
            "flat offset"
        ]);

        layout
            .anchors()
            .iter()
            .enumerate()
            .for_each(|(index, &[w, h])| {
                let scale = layout.scale_of(index);
                table.add_row(row![
                    index,
                    format!("{}x{}", w, h),
                    index / 3,
                    scale.stride,
                    format!("{0}x{0}", scale.grid_size),
                    scale.flat_offset,
                ]);
            });

        table.printstd();
    }

    println!("image size: {}", layout.image_size());
    println!("predictions per image: {}", layout.num_predictions());
    println!(
        "classes: {} ({} .. {})",
        category_map.num_classes(),
        category_map.class_name(0).unwrap_or_default(),
        category_map
            .class_name(category_map.num_classes() - 1)
            .unwrap_or_default()
    );

    Ok(())
}

fn assign(config_file: impl AsRef<Path>, cxcywh: [f64; 4]) -> Result<()> {
    let config = Config::open(config_file)?;
    let layout = config.grid_layout()?;
    let [_cx, _cy, w, h] = cxcywh;
    ensure!(
        cxcywh.iter().all(|value| value.is_finite()) && w >= 0.0 && h >= 0.0,
        "invalid box {:?}",
        cxcywh
    );

    let targets = Tensor::of_slice(&cxcywh).view([1, 1, 4]);
    let counts = Tensor::of_slice(&[1i64]);
    let encoded = f_preprocess_targets(&targets, &counts, &layout)?;
    let flat_index = encoded.flat_indexes.int64_value(&[0]);
    let location = layout.locate(flat_index)?;
    info!("box {:?} is assigned to flat index {}", cxcywh, flat_index);

    // print shape similarity to each anchor
    {
        let ious = tch_goodies::f_pairwise_iou(
            &targets,
            &layout.anchor_boxes(Device::Cpu),
            IouMode::CenterAligned,
        )?
        .to_kind(Kind::Double)
        .view([-1]);
        let ious = Vec::<f64>::from(&ious);

        let mut table = Table::new();
        table.add_row(row!["anchor", "size", "iou", "chosen"]);
        layout
            .anchors()
            .iter()
            .zip(ious)
            .enumerate()
            .for_each(|(index, (&[aw, ah], iou))| {
                let chosen = if index == location.anchor_index { "*" } else { "" };
                table.add_row(row![index, format!("{}x{}", aw, ah), format!("{:.4}", iou), chosen]);
            });
        table.printstd();
    }

    let target = Vec::<f64>::from(&encoded.targets.view([-1]));
    println!("anchor: {}", location.anchor_index);
    println!("grid cell (x, y): ({}, {})", location.grid_x, location.grid_y);
    println!("flat index: {}", flat_index);
    println!(
        "encoded (tx, ty, tw, th): ({:.6}, {:.6}, {:.6}, {:.6})",
        target[0], target[1], target[2], target[3]
    );

    Ok(())
}
