//! Exposition output checks against golden vectors.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::fs;

use serde::Deserialize;

use meterline_core::{render, Buckets, LabelSet, Registry};

fn load(name: &str) -> String {
    fs::read_to_string(format!("tests/vectors/{name}")).unwrap()
}

#[derive(Debug, Deserialize)]
struct HistogramCase {
    description: String,
    buckets: Vec<f64>,
    observations: Vec<f64>,
    expect_cumulative: Vec<u64>,
    expect_sum: f64,
}

fn worked_example() -> Registry {
    let reg = Registry::new();
    reg.register_counter("jobs_total", "Jobs processed.").unwrap();
    reg.register_histogram(
        "request_seconds",
        "Request duration in seconds.",
        vec![0.1, 0.5, 1.0],
    )
    .unwrap();

    let none = LabelSet::new();
    reg.inc("jobs_total", &none);
    reg.inc("jobs_total", &none);
    for v in [0.05, 0.3, 2.0] {
        reg.histogram_observe("request_seconds", &none, v);
    }
    reg
}

#[test]
fn worked_example_matches_golden_output() {
    let out = worked_example().render().unwrap();
    assert_eq!(out, load("worked_example.prom"));
    assert!(out.contains("jobs_total 2\n"));
    assert!(out.contains("request_seconds_bucket{le=\"+Inf\"} 3\n"));
}

#[test]
fn render_is_idempotent() {
    let reg = worked_example();
    let labels = LabelSet::from_pairs(&[("method", "GET"), ("route", "/a")]).unwrap();
    reg.register_counter("http_total", "Requests.").unwrap();
    reg.inc("http_total", &labels);
    reg.inc("http_total", &LabelSet::from_pairs(&[("method", "POST"), ("route", "/a")]).unwrap());

    let first = render(&reg.snapshot()).unwrap();
    let second = render(&reg.snapshot()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn families_follow_registration_order() {
    let reg = Registry::new();
    reg.register_counter("zzz_total", "Last name, first registered.").unwrap();
    reg.register_counter("aaa_total", "First name, second registered.").unwrap();
    let out = reg.render().unwrap();
    let z = out.find("# HELP zzz_total").unwrap();
    let a = out.find("# HELP aaa_total").unwrap();
    assert!(z < a);
    assert_eq!(reg.metric_names(), vec!["zzz_total", "aaa_total"]);
}

#[test]
fn series_sorted_and_escaped() {
    let reg = Registry::new();
    reg.register_counter("c_total", "C.").unwrap();
    reg.inc("c_total", &LabelSet::new().with("v", "b").unwrap());
    reg.inc("c_total", &LabelSet::new().with("v", "a\"quoted\"").unwrap());
    let out = reg.render().unwrap();
    let expected = "# HELP c_total C.\n\
# TYPE c_total counter\n\
c_total{v=\"a\\\"quoted\\\"\"} 1\n\
c_total{v=\"b\"} 1\n";
    assert_eq!(out, expected);
}

#[test]
fn counter_renders_sum_of_deltas() {
    let reg = Registry::new();
    reg.register_counter("bytes_total", "Bytes.").unwrap();
    let labels = LabelSet::new().with("dir", "in").unwrap();
    let deltas = [0.0, 1.0, 2.5, 10.0, 0.25];
    for d in deltas {
        reg.counter_increment("bytes_total", &labels, d);
    }
    let total: f64 = deltas.iter().sum();
    let out = reg.render_metric("bytes_total").unwrap();
    assert!(out.contains(&format!("bytes_total{{dir=\"in\"}} {total}\n")), "{out}");
    assert_eq!(total, 13.75);
}

#[test]
fn histogram_vectors() {
    let cases: Vec<HistogramCase> = serde_json::from_str(&load("histogram_cases.json")).unwrap();
    for case in cases {
        let reg = Registry::new();
        reg.register_histogram("h", "H.", case.buckets.clone()).unwrap();
        for v in &case.observations {
            reg.try_histogram_observe("h", &LabelSet::new(), *v).unwrap();
        }
        let snap = reg.snapshot();
        let sample = snap.family("h").unwrap().histogram(&LabelSet::new()).unwrap();

        assert_eq!(sample.cumulative, case.expect_cumulative, "{}", case.description);
        assert_eq!(sample.count, case.observations.len() as u64, "{}", case.description);
        assert!(
            (sample.sum - case.expect_sum).abs() < 1e-9,
            "{}: sum {} != {}",
            case.description,
            sample.sum,
            case.expect_sum
        );
        for w in sample.cumulative.windows(2) {
            assert!(w[0] <= w[1], "{}: not cumulative", case.description);
        }

        let out = reg.render().unwrap();
        let inf = format!("h_bucket{{le=\"+Inf\"}} {}\n", case.observations.len());
        assert!(out.contains(&inf), "{}", case.description);
    }
}

#[test]
fn default_latency_buckets_render_cleanly() {
    let reg = Registry::new();
    reg.register_histogram("lat_seconds", "Latency.", Buckets::default_latency())
        .unwrap();
    reg.histogram_observe("lat_seconds", &LabelSet::new(), 0.2);
    let out = reg.render().unwrap();
    assert!(out.contains("lat_seconds_bucket{le=\"0.005\"} 0\n"));
    assert!(out.contains("lat_seconds_bucket{le=\"0.25\"} 1\n"));
    assert!(out.contains("lat_seconds_bucket{le=\"10\"} 1\n"));
    assert!(out.contains("lat_seconds_sum 0.2\n"));
}

#[test]
fn registered_but_unobserved_metric_renders_headers_only() {
    let reg = Registry::new();
    reg.register_counter("idle_total", "Never touched.").unwrap();
    assert_eq!(
        reg.render().unwrap(),
        "# HELP idle_total Never touched.\n# TYPE idle_total counter\n"
    );
}
