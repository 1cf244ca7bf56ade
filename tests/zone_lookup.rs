//! End-to-end: KML on disk -> query service -> text report.

use std::io::Write;

use tempfile::NamedTempFile;
use zonefinder::{
    render_report, Coordinate, LoadOutcome, QueryOutcome, QueryService, ServiceStatus,
};

const CITY_ZONES: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<kml xmlns="http://www.opengis.net/kml/2.2">
  <Document>
    <name>City</name>
    <Folder>
      <Placemark>
        <name>Downtown</name>
        <description>Central business district</description>
        <ExtendedData>
          <Data name="zoneType"><value>Commercial</value></Data>
          <Data name="ward"><value>1</value></Data>
        </ExtendedData>
        <Polygon>
          <outerBoundaryIs>
            <LinearRing>
              <coordinates>0,0 10,0 10,10 0,10 0,0</coordinates>
            </LinearRing>
          </outerBoundaryIs>
          <innerBoundaryIs>
            <LinearRing>
              <coordinates>4,4 6,4 6,6 4,6 4,4</coordinates>
            </LinearRing>
          </innerBoundaryIs>
        </Polygon>
      </Placemark>
      <Placemark>
        <name>Riverside</name>
        <ExtendedData>
          <Data name="zoneType"><value>Residential</value></Data>
        </ExtendedData>
        <Polygon>
          <LinearRing>
            <coordinates>8,8 20,8 20,20 8,20 8,8</coordinates>
          </LinearRing>
        </Polygon>
      </Placemark>
    </Folder>
  </Document>
</kml>
"#;

fn write_document(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

async fn report_at(service: &QueryService, lat: f64, lng: f64) -> String {
    match service.query(Coordinate::new(lat, lng)).await.unwrap() {
        QueryOutcome::Completed(check) => render_report(&check.results),
        QueryOutcome::NothingLoaded => panic!("zones should be loaded"),
    }
}

#[tokio::test]
async fn test_load_and_report() {
    let file = write_document(CITY_ZONES);
    let service = QueryService::default();

    let outcome = service.load_path(file.path(), |_| {}).await.unwrap();
    let LoadOutcome::Loaded(report) = outcome else {
        panic!("expected a completed load");
    };
    assert_eq!(report.zone_count, 3);
    assert_eq!(service.status(), ServiceStatus::Ready { zone_count: 3 });

    assert_eq!(
        report_at(&service, 2.0, 2.0).await,
        "Zone: Downtown\n  description: Central business district\n  ward: 1\n  zoneType: Commercial\n\n"
    );

    // The hole is its own zone and does not cancel the outer ring
    let hole = report_at(&service, 5.0, 5.0).await;
    assert!(hole.starts_with("Zone: Downtown\n"));
    assert!(hole.contains("Zone: Downtown - Inner\n"));

    // Overlap of Downtown and Riverside, in document order
    let overlap = report_at(&service, 9.0, 9.0).await;
    let downtown = overlap.find("Zone: Downtown\n").unwrap();
    let riverside = overlap.find("Zone: Riverside\n").unwrap();
    assert!(downtown < riverside);

    assert_eq!(
        report_at(&service, -5.0, -5.0).await,
        "Address not found in any defined zones."
    );
}

#[tokio::test]
async fn test_reload_from_identical_bytes_is_stable() {
    let first = write_document(CITY_ZONES);
    let second = write_document(CITY_ZONES);
    let service = QueryService::default();

    service.load_path(first.path(), |_| {}).await.unwrap();
    let before = report_at(&service, 9.0, 9.0).await;

    service.load_path(second.path(), |_| {}).await.unwrap();
    let after = report_at(&service, 9.0, 9.0).await;

    assert_eq!(before, after);
    assert_eq!(service.status(), ServiceStatus::Ready { zone_count: 3 });
}

#[tokio::test]
async fn test_malformed_reload_keeps_zones() {
    let good = write_document(CITY_ZONES);
    let bad = write_document(&CITY_ZONES.replace("</Folder>", ""));
    let service = QueryService::default();

    service.load_path(good.path(), |_| {}).await.unwrap();
    assert!(service.load_path(bad.path(), |_| {}).await.is_err());

    assert_eq!(service.status(), ServiceStatus::Ready { zone_count: 3 });
    assert!(report_at(&service, 2.0, 2.0).await.starts_with("Zone: Downtown\n"));
}
