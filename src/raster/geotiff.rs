//! Native GeoTIFF writer built on the `tiff` crate
//!
//! Writes single band 64-bit float images with ModelPixelScale, ModelTiepoint,
//! GeoKeyDirectory and GDAL_NODATA tags.

use std::fs::File;
use std::io::{BufWriter, Seek, Write};
use std::path::Path;

use tiff::encoder::colortype::Gray64Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{Error, Result};
use crate::Grid;

use super::{RasterMetadata, RasterWriter};

const MODEL_PIXEL_SCALE_TAG: u16 = 33550;
const MODEL_TIEPOINT_TAG: u16 = 33922;
const GEO_KEY_DIRECTORY_TAG: u16 = 34735;
const GDAL_NODATA_TAG: u16 = 42113;

const GT_MODEL_TYPE_GEO_KEY: u16 = 1024;
const GT_RASTER_TYPE_GEO_KEY: u16 = 1025;
const GEOGRAPHIC_TYPE_GEO_KEY: u16 = 2048;
const PROJECTED_CS_TYPE_GEO_KEY: u16 = 3072;

#[derive(Debug, Clone, Copy, Default)]
pub struct GeoTiffWriter;

/// GeoKeyDirectory entries declaring `epsg` as the raster CRS.
pub fn geo_keys(epsg: u32) -> Result<Vec<u16>> {
    let code = u16::try_from(epsg)
        .map_err(|_| Error::invalid_parameter("epsg", epsg, "does not fit a GeoTIFF key"))?;

    // EPSG 4000-4999 are geographic 2D systems
    let (model_type, crs_key) = if (4000..5000).contains(&epsg) {
        (2, GEOGRAPHIC_TYPE_GEO_KEY)
    } else {
        (1, PROJECTED_CS_TYPE_GEO_KEY)
    };

    #[rustfmt::skip]
    let keys = vec![
        1, 1, 0, 3, // version 1.1.0, 3 keys
        GT_MODEL_TYPE_GEO_KEY, 0, 1, model_type,
        GT_RASTER_TYPE_GEO_KEY, 0, 1, 1, // RasterPixelIsArea
        crs_key, 0, 1, code,
    ];
    Ok(keys)
}

/// Encode `grid` as a GeoTIFF into any `Write + Seek` sink.
pub fn encode_geotiff<W: Write + Seek>(
    grid: &Grid,
    metadata: &RasterMetadata,
    writer: W,
) -> std::result::Result<(), String> {
    if metadata.band_count != 1 {
        return Err(format!(
            "only single band rasters are supported, got {} bands",
            metadata.band_count
        ));
    }

    let (rows, cols) = grid.dim();
    let keys = geo_keys(metadata.epsg).map_err(|e| e.to_string())?;

    let mut encoder = TiffEncoder::new(writer).map_err(|e| format!("TIFF encoder error: {e}"))?;
    let mut image = encoder
        .new_image::<Gray64Float>(cols as u32, rows as u32)
        .map_err(|e| format!("cannot create TIFF image: {e}"))?;

    let (dx, dy) = metadata.cell_size;
    let scale = [dx, dy.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_PIXEL_SCALE_TAG), &scale[..])
        .map_err(|e| format!("cannot write scale tag: {e}"))?;

    let (x0, y0) = metadata.origin;
    let tiepoint = [0.0, 0.0, 0.0, x0, y0, 0.0];
    image
        .encoder()
        .write_tag(Tag::Unknown(MODEL_TIEPOINT_TAG), &tiepoint[..])
        .map_err(|e| format!("cannot write tiepoint tag: {e}"))?;

    image
        .encoder()
        .write_tag(Tag::Unknown(GEO_KEY_DIRECTORY_TAG), keys.as_slice())
        .map_err(|e| format!("cannot write geokey tag: {e}"))?;

    if let Some(nodata) = metadata.nodata {
        image
            .encoder()
            .write_tag(Tag::Unknown(GDAL_NODATA_TAG), nodata.to_string().as_str())
            .map_err(|e| format!("cannot write nodata tag: {e}"))?;
    }

    // row-major, top row first
    let data = grid.iter().copied().collect::<Vec<f64>>();
    image
        .write_data(&data)
        .map_err(|e| format!("cannot write image data: {e}"))?;

    Ok(())
}

impl RasterWriter for GeoTiffWriter {
    fn write(&self, path: &Path, grid: &Grid, metadata: &RasterMetadata) -> Result<()> {
        let output_error = |reason: String| Error::Output {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::create(path).map_err(|e| output_error(e.to_string()))?;
        let mut writer = BufWriter::new(file);
        encode_geotiff(grid, metadata, &mut writer).map_err(output_error)?;
        writer.flush().map_err(|e| output_error(e.to_string()))?;

        debug!(path = %path.display(), shape = ?grid.dim(), "raster written");
        Ok(())
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use ndarray::arr2;
    use tiff::decoder::{Decoder, DecodingResult};

    use super::*;

    fn metadata() -> RasterMetadata {
        RasterMetadata {
            origin: (100.0, 500.0),
            cell_size: (10.0, -20.0),
            band_count: 1,
            epsg: 3438,
            nodata: Some(-9999.0),
        }
    }

    #[test]
    fn geotiff_round_trips_values_and_georeferencing() {
        let grid = arr2(&[[1.5, 2.5, 3.5], [4.5, -9999.0, 6.5]]);
        let mut buf = Vec::new();
        encode_geotiff(&grid, &metadata(), Cursor::new(&mut buf)).unwrap();

        let mut decoder = Decoder::new(Cursor::new(buf)).unwrap();
        assert_eq!(decoder.dimensions().unwrap(), (3, 2));

        let scale = decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_PIXEL_SCALE_TAG))
            .unwrap();
        assert_eq!(scale, vec![10.0, 20.0, 0.0]);
        let tiepoint = decoder
            .get_tag_f64_vec(Tag::from_u16_exhaustive(MODEL_TIEPOINT_TAG))
            .unwrap();
        assert_eq!(&tiepoint[3..5], &[100.0, 500.0]);
        let nodata = decoder.get_tag_ascii_string(Tag::from_u16_exhaustive(GDAL_NODATA_TAG)).unwrap();
        assert_eq!(nodata.trim_end_matches('\0'), "-9999");

        match decoder.read_image().unwrap() {
            DecodingResult::F64(values) => {
                assert_eq!(values, vec![1.5, 2.5, 3.5, 4.5, -9999.0, 6.5])
            }
            _ => panic!("expected f64 samples"),
        }
    }

    #[test]
    fn multiband_rejected() {
        let grid = arr2(&[[1.0]]);
        let meta = RasterMetadata {
            band_count: 3,
            ..metadata()
        };
        assert!(encode_geotiff(&grid, &meta, Cursor::new(Vec::new())).is_err());
    }

    #[test]
    fn geographic_and_projected_keys() {
        let projected = geo_keys(3438).unwrap();
        assert_eq!(&projected[12..], &[PROJECTED_CS_TYPE_GEO_KEY, 0, 1, 3438]);
        let geographic = geo_keys(4326).unwrap();
        assert_eq!(geographic[7], 2);
        assert_eq!(&geographic[12..], &[GEOGRAPHIC_TYPE_GEO_KEY, 0, 1, 4326]);
        assert!(geo_keys(100_000).is_err());
    }

    #[test]
    fn unwritable_path_is_output_error() {
        let err = GeoTiffWriter
            .write(
                Path::new("/nonexistent-dir/out.tiff"),
                &arr2(&[[1.0]]),
                &metadata(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Output { .. }));
    }
}
