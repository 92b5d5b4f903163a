//! Data export advisor.
//!
//! Recommends a data source and file formats for a download request. This is
//! a single structured extraction guarded by the same validation and
//! corrective retry as parameter resolution.

use crate::error::Result;
use crate::extractor::{ExtractionRequest, StructuredExtractor};
use crate::history::ChatHistory;
use crate::resolver::{extract_until_valid, LoopLabel};
use crate::retry::RetryPolicy;
use crate::schema::SchemaValidator;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

const EXPORT_SCHEMA_NAME: &str = "export";
const EXPORT_STAGE: &str = "export";

const EXPORT_SYSTEM_PROMPT: &str = "\
You are trying to help people get data. Geospatial data comes from a variety of sources \
including the USGS and OpenStreetMap. Users will want these datasets in formats which can \
be used in their preferred geospatial client.

dataSource needs to be one of \"usgs-transportation\", \"usgs-water\", \"osm\", \"landsat\", \
\"usgs-imagery\", \"usgs-elevation\" and fileFormat can be one or more options. File formats \
should only be recommended for data types they support. If a user wants feature data such as \
roads, buildings or any descriptive geographical information then a format that supports \
feature data should be recommended such as gpkg or shapefile, whichever supports their \
desired use case the best. If the user isn't sure which format makes sense for feature data, \
then geopackage is typically a good recommendation. If the user wants imagery data (or other \
kinds of raster data) then they likely want landsat data. Geotiff (gtiff) or geopackage \
(gpkg) would be good choices for that data type. KML is a file format that supports embedded \
styles and works with Google Earth and ATAK. Elevation data is only supported by gtiff.

Here are some examples.

Example User: I need data for Africa.
Example Response: {\"dataSource\": \"osm\", \"fileFormat\": [\"gpkg\"]}

Example User: My job involves the US.
Example Response: {\"dataSource\": \"usgs-transportation\", \"fileFormat\": [\"Esri Shapefile\"]}

Example User: I need imagery that will work within ArcGIS.
Example Response: {\"dataSource\": \"landsat\", \"fileFormat\": [\"gtiff\"]}

Example User: I need rivers in the US that will open in QGIS.
Example Response: {\"dataSource\": \"usgs-water\", \"fileFormat\": [\"gpkg\"]}";

/// Where the data comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DataSource {
    UsgsTransportation,
    Osm,
    Landsat,
    UsgsWater,
    UsgsImagery,
    UsgsElevation,
}

impl DataSource {
    pub const ALL: [DataSource; 6] = [
        DataSource::UsgsTransportation,
        DataSource::Osm,
        DataSource::Landsat,
        DataSource::UsgsWater,
        DataSource::UsgsImagery,
        DataSource::UsgsElevation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::UsgsTransportation => "usgs-transportation",
            DataSource::Osm => "osm",
            DataSource::Landsat => "landsat",
            DataSource::UsgsWater => "usgs-water",
            DataSource::UsgsImagery => "usgs-imagery",
            DataSource::UsgsElevation => "usgs-elevation",
        }
    }
}

/// Export file format, named as the GDAL driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FileFormat {
    #[serde(rename = "gpkg")]
    GeoPackage,
    #[serde(rename = "Esri Shapefile")]
    Shapefile,
    #[serde(rename = "gtiff")]
    GeoTiff,
    #[serde(rename = "kml")]
    Kml,
}

impl FileFormat {
    pub const ALL: [FileFormat; 4] = [
        FileFormat::GeoPackage,
        FileFormat::Shapefile,
        FileFormat::GeoTiff,
        FileFormat::Kml,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileFormat::GeoPackage => "gpkg",
            FileFormat::Shapefile => "Esri Shapefile",
            FileFormat::GeoTiff => "gtiff",
            FileFormat::Kml => "kml",
        }
    }
}

/// Advisor output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecommendation {
    #[serde(rename = "dataSource")]
    pub data_source: DataSource,
    #[serde(rename = "fileFormat")]
    pub file_format: Vec<FileFormat>,
}

/// JSON Schema for [`ExportRecommendation`].
pub fn export_schema() -> Value {
    let sources: Vec<&str> = DataSource::ALL.iter().map(DataSource::as_str).collect();
    let formats: Vec<&str> = FileFormat::ALL.iter().map(FileFormat::as_str).collect();

    json!({
        "type": "object",
        "description": "A data source and the file formats recommended for it.",
        "properties": {
            "dataSource": {
                "type": "string",
                "enum": sources,
                "description": "usgs-transportation: US road features. osm: OpenStreetMap features for the entire world, including buildings and transportation routes. landsat: global four-band imagery (blue, green, red, near infrared), useful for NDVI or NDWI. usgs-water: US water features. usgs-imagery: high quality US imagery. usgs-elevation: high quality US elevation data."
            },
            "fileFormat": {
                "type": "array",
                "items": {"type": "string", "enum": formats},
                "minItems": 1
            }
        },
        "required": ["dataSource", "fileFormat"],
        "additionalProperties": false
    })
}

/// Recommends export settings for free-text data requests.
#[derive(Clone)]
pub struct DataExportAdvisor {
    extractor: StructuredExtractor,
    validator: SchemaValidator,
    policy: RetryPolicy,
}

impl DataExportAdvisor {
    pub fn new(extractor: StructuredExtractor, policy: RetryPolicy) -> Result<Self> {
        Ok(Self {
            extractor,
            validator: SchemaValidator::compile(export_schema())?,
            policy,
        })
    }

    pub async fn advise(
        &self,
        user_text: &str,
        cancel: &CancellationToken,
    ) -> Result<ExportRecommendation> {
        let history = ChatHistory::new(0, Default::default());
        let request = ExtractionRequest::new(
            EXPORT_SYSTEM_PROMPT,
            &history,
            user_text,
            self.validator.schema(),
            EXPORT_SCHEMA_NAME,
        );

        extract_until_valid(
            &self.extractor,
            &self.validator,
            request,
            self.policy,
            LoopLabel::new(EXPORT_STAGE, EXPORT_SCHEMA_NAME),
            |value| serde_json::from_value(value.clone()).map_err(|e| (value, e.to_string())),
            cancel,
        )
        .await
    }
}
