//! Integration test: write heatmaps to GeoTIFF and decode them again.
//!
//! Verifies orientation, georeferencing tags, nodata handling and the
//! overview IFDs using the `tiff` decoder directly.

use std::fs::File;
use std::path::Path;

use approx::assert_relative_eq;
use diversity_heatmap::{
    GeoTiffWriter, HeatmapConfig, HeatmapGrid, HeatmapPipeline, NormalizationOutcome, Occurrence,
    OverviewConfig, Resampling,
};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

fn tag(code: u16) -> Tag {
    Tag::from_u16_exhaustive(code)
}

fn open(path: &Path) -> Decoder<File> {
    Decoder::new(File::open(path).expect("Failed to open GeoTIFF")).expect("Failed to decode GeoTIFF")
}

fn read_f64(decoder: &mut Decoder<File>) -> Vec<f64> {
    match decoder.read_image().expect("Failed to read image") {
        DecodingResult::F64(buf) => buf,
        _ => panic!("expected 64-bit float samples"),
    }
}

/// 3 x 2 grid, value at (ix, iy) = 0.1 * (ix + 1) + 0.5 * iy, (0, 0) no-data.
fn labelled_grid() -> HeatmapGrid {
    let mut values = Vec::new();
    for ix in 0..3 {
        for iy in 0..2 {
            if ix == 0 && iy == 0 {
                values.push(None);
            } else {
                values.push(Some(0.1 * (ix + 1) as f64 + 0.5 * iy as f64));
            }
        }
    }
    HeatmapGrid::new(
        values,
        vec![0.0, 10.0, 20.0, 30.0],
        vec![0.0, 10.0, 20.0],
        NormalizationOutcome::Rescaled { min: 0.0, max: 1.0 },
    )
    .expect("valid grid")
}

#[test]
fn test_orientation_and_georeferencing() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("labelled.tif");

    let writer = GeoTiffWriter::new(OverviewConfig::default());
    let result = writer
        .write(&labelled_grid(), "EPSG:3067", &path)
        .expect("Failed to write");
    assert!(result.bytes_written > 0);
    assert_eq!(result.path, path);

    let mut decoder = open(&path);
    assert_eq!(decoder.dimensions().unwrap(), (3, 2));

    let pixels = read_f64(&mut decoder);
    // Row 0 is the northern row (iy = 1).
    assert_relative_eq!(pixels[0], 0.6, epsilon = 1e-12);
    assert_relative_eq!(pixels[1], 0.7, epsilon = 1e-12);
    assert_relative_eq!(pixels[2], 0.8, epsilon = 1e-12);
    assert!(pixels[3].is_nan());
    assert_relative_eq!(pixels[4], 0.2, epsilon = 1e-12);
    assert_relative_eq!(pixels[5], 0.3, epsilon = 1e-12);

    let scale = decoder.get_tag_f64_vec(tag(33550)).unwrap();
    assert_eq!(&scale[..2], &[10.0, 10.0]);
    let tiepoint = decoder.get_tag_f64_vec(tag(33922)).unwrap();
    assert_eq!(&tiepoint[3..5], &[0.0, 20.0]);

    let geokeys = decoder.get_tag_u16_vec(tag(34735)).unwrap();
    assert_eq!(&geokeys[12..], &[3072, 0, 1, 3067]);

    assert_eq!(decoder.get_tag_ascii_string(tag(42113)).unwrap(), "nan");
    let gdal_metadata = decoder.get_tag_ascii_string(tag(42112)).unwrap();
    assert!(gdal_metadata.contains("domain=\"rio_overview\""));
    assert!(gdal_metadata.contains(">average<"));
}

#[test]
fn test_overview_levels() {
    let (nx, ny) = (40, 24);
    let values = (0..nx * ny).map(|i| Some((i % 7) as f64 / 6.0)).collect();
    let x_edges = (0..=nx).map(|i| i as f64 * 5.0).collect();
    let y_edges = (0..=ny).map(|i| 1000.0 + i as f64 * 5.0).collect();
    let grid = HeatmapGrid::new(
        values,
        x_edges,
        y_edges,
        NormalizationOutcome::Rescaled { min: 0.0, max: 1.0 },
    )
    .unwrap();

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("pyramid.tif");
    let result = GeoTiffWriter::new(OverviewConfig::default())
        .write(&grid, "EPSG:3067", &path)
        .expect("Failed to write");

    let expected = [(20, 12), (10, 6), (5, 3), (3, 2)];
    let reported: Vec<(usize, usize)> = result
        .metadata
        .overviews
        .iter()
        .map(|o| (o.width, o.height))
        .collect();
    assert_eq!(reported, expected);
    for overview in &result.metadata.overviews {
        let size = 5.0 * overview.factor as f64;
        assert_eq!(overview.transform.pixel_size(), (size, size));
        assert_eq!(overview.transform.origin_y, 1120.0);
    }

    let mut decoder = open(&path);
    assert_eq!(decoder.dimensions().unwrap(), (40, 24));

    for &(w, h) in &expected {
        assert!(decoder.more_images());
        decoder.next_image().expect("Failed to advance to overview");
        assert_eq!(decoder.dimensions().unwrap(), (w as u32, h as u32));
        assert_eq!(decoder.get_tag_u32(tag(254)).unwrap(), 1);

        let pixels = read_f64(&mut decoder);
        assert_eq!(pixels.len(), w * h);
        assert!(pixels.iter().all(|v| (0.0..=1.0).contains(v)));
    }
    assert!(!decoder.more_images());
}

#[test]
fn test_overview_resampling_recorded() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("max.tif");
    let config = OverviewConfig {
        factors: vec![2],
        resampling: Resampling::Max,
    };
    GeoTiffWriter::new(config)
        .write(&labelled_grid(), "EPSG:4326", &path)
        .expect("Failed to write");

    let mut decoder = open(&path);
    let gdal_metadata = decoder.get_tag_ascii_string(tag(42112)).unwrap();
    assert!(gdal_metadata.contains(">max<"));

    let geokeys = decoder.get_tag_u16_vec(tag(34735)).unwrap();
    assert_eq!(&geokeys[12..], &[2048, 0, 1, 4326]);

    decoder.next_image().unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (2, 1));
    let pixels = read_f64(&mut decoder);
    // Left block: 0.6, 0.7, nan, 0.2 -> max 0.7; right block: 0.8, 0.3 -> 0.8
    assert_relative_eq!(pixels[0], 0.7, epsilon = 1e-12);
    assert_relative_eq!(pixels[1], 0.8, epsilon = 1e-12);
}

#[test]
fn test_factor_beyond_raster_size() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("single_pixel_overview.tif");
    let config = OverviewConfig {
        factors: vec![usize::MAX],
        resampling: Resampling::Average,
    };
    let result = GeoTiffWriter::new(config)
        .write(&labelled_grid(), "EPSG:3067", &path)
        .expect("Failed to write");
    assert_eq!(result.metadata.overviews.len(), 1);
    assert_eq!((result.metadata.overviews[0].width, result.metadata.overviews[0].height), (1, 1));

    let mut decoder = open(&path);
    decoder.next_image().unwrap();
    assert_eq!(decoder.dimensions().unwrap(), (1, 1));
    let pixels = read_f64(&mut decoder);
    // Mean of the five valid pixels.
    assert_relative_eq!(pixels[0], (0.6 + 0.7 + 0.8 + 0.2 + 0.3) / 5.0, epsilon = 1e-12);
}

#[test]
fn test_failed_export_leaves_no_file() {
    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("bad_crs.tif");

    let err = GeoTiffWriter::new(OverviewConfig::default())
        .write(&labelled_grid(), "definitely not a crs", &path)
        .unwrap_err();
    assert!(err.is_export_error());
    assert!(!path.exists());
    assert_eq!(std::fs::read_dir(temp_dir.path()).unwrap().count(), 0);

    let missing_dir = temp_dir.path().join("missing").join("out.tif");
    let err = GeoTiffWriter::new(OverviewConfig::default())
        .write(&labelled_grid(), "EPSG:3067", &missing_dir)
        .unwrap_err();
    assert!(err.is_export_error());
    assert!(!missing_dir.exists());
}

#[test]
fn test_pipeline_run_writes_raster() {
    let occurrences: Vec<Occurrence> = (0..400)
        .map(|i| {
            let x = 380_000.0 + (i * 37 % 1000) as f64;
            let y = 6_670_000.0 + (i * 53 % 800) as f64;
            Occurrence::new(x, y, format!("MX.{}", i % 9))
        })
        .collect();
    let config = HeatmapConfig {
        cell_size: 50.0,
        ..Default::default()
    };
    let pipeline = HeatmapPipeline::new(config).unwrap();

    let temp_dir = tempfile::tempdir().expect("Failed to create temp dir");
    let path = temp_dir.path().join("heatmap.tif");
    let (run, written) = pipeline
        .run(&occurrences, "EPSG:3067", &path)
        .expect("Failed to run pipeline");

    let (nx, ny) = run.grid.shape();
    assert_eq!(written.metadata.shape, (nx, ny));

    let mut decoder = open(&path);
    assert_eq!(decoder.dimensions().unwrap(), (nx as u32, ny as u32));

    let (x_size, y_size) = written.metadata.transform.pixel_size();
    let x_edges = run.grid.x_edges();
    let y_edges = run.grid.y_edges();
    assert_relative_eq!(x_size, x_edges[1] - x_edges[0], epsilon = 1e-9);
    assert_relative_eq!(y_size, y_edges[1] - y_edges[0], epsilon = 1e-9);
    assert_eq!(written.metadata.transform.origin_x, x_edges[0]);
    assert_eq!(written.metadata.transform.origin_y, y_edges[ny]);
}
