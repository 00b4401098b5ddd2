//! OSRM integration test against a local container.
//!
//! Needs a prepared MLD dataset: set `OSRM_DATA_DIR` to a directory holding
//! `cambridgeshire-latest.osrm*`. Without it the test returns early.

mod fixtures;

use std::env;
use std::path::PathBuf;

use testcontainers::core::{IntoContainerPort, Mount};
use testcontainers::ReuseDirective;
use testcontainers::runners::SyncRunner;
use testcontainers::{Container, GenericImage, ImageExt, TestcontainersError};

use fixtures::{DEPOT, TOWN};
use night_route::config::NavConfig;
use night_route::eta::{EtaSource, estimate_eta};
use night_route::haversine::Coordinate;
use night_route::osrm::{OsrmClient, OsrmConfig};
use night_route::stops::StopList;
use night_route::traits::RouteProvider;

const DATASET: &str = "cambridgeshire-latest.osrm";

fn osrm_container(data_dir: PathBuf) -> Result<(Container<GenericImage>, String), TestcontainersError> {
    let image = GenericImage::new("osrm/osrm-backend", "latest")
        .with_exposed_port(5000.tcp())
        .with_mount(Mount::bind_mount(data_dir.to_string_lossy().to_string(), "/data"))
        .with_cmd(vec![
            "osrm-routed".to_string(),
            "--algorithm".to_string(),
            "mld".to_string(),
            format!("/data/{DATASET}"),
        ])
        .with_container_name("osrm-cambridgeshire-mld")
        .with_startup_timeout(std::time::Duration::from_secs(30))
        .with_reuse(ReuseDirective::Always);

    let container = image.start()?;
    let port = container.get_host_port_ipv4(5000.tcp())?;
    let base_url = format!("http://127.0.0.1:{}", port);

    Ok((container, base_url))
}

fn dataset_dir() -> Option<PathBuf> {
    let dir = PathBuf::from(env::var("OSRM_DATA_DIR").ok()?);
    if dir.join(format!("{DATASET}.partition")).exists() {
        Some(dir)
    } else {
        eprintln!("OSRM_DATA_DIR has no {DATASET}.partition, skipping");
        None
    }
}

#[test]
fn osrm_route_returns_geometry_and_legs() {
    let Some(data_dir) = dataset_dir() else {
        return;
    };
    let (container, base_url) = osrm_container(data_dir).expect("start OSRM container");

    let client = OsrmClient::new(OsrmConfig {
        base_url,
        profile: "driving".to_string(),
        timeout_secs: 10,
    })
    .expect("build OSRM client");

    let waypoints: Vec<Coordinate> = std::iter::once(DEPOT.coordinate())
        .chain(TOWN[..3].iter().map(|l| l.coordinate()))
        .collect();

    let route = {
        let start = std::time::Instant::now();
        let mut last = client.route(&waypoints);
        while last.is_err() && start.elapsed() < std::time::Duration::from_secs(15) {
            std::thread::sleep(std::time::Duration::from_millis(500));
            last = client.route(&waypoints);
        }
        last
    };
    if let Err(err) = &route {
        eprintln!("OSRM error: {err}");
        if let Ok(stderr) = container.stderr_to_vec() {
            if !stderr.is_empty() {
                eprintln!("OSRM stderr:\n{}", String::from_utf8_lossy(&stderr));
            }
        }
    }
    let route = route.expect("route from OSRM");

    assert_eq!(route.leg_durations_secs.len(), waypoints.len() - 1);
    assert!(route.duration_secs > 0.0);
    assert!(route.polyline.len() > waypoints.len());

    let mut stops = StopList::new();
    for location in &TOWN[..3] {
        stops.append(location.name, location.coordinate());
    }
    let eta = estimate_eta(&client, DEPOT.coordinate(), stops.as_slice(), &NavConfig::default())
        .expect("stops remain");
    assert_eq!(eta.source, EtaSource::Routed);
    assert!(eta.next_in.is_some());

    drop(container);
}
