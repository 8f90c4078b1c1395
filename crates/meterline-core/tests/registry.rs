//! Registration rules, error taxonomy and the log-and-drop policy.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use meterline_core::{
    LabelSet, Metric, MetricKind, MetricType, Registry, StaticCollector,
};

#[test]
fn invalid_name_rejected() {
    let reg = Registry::new();
    for bad in ["", "9lives", "with-dash", "with space"] {
        let err = reg.register_counter(bad, "x").err().expect("must fail");
        assert_eq!(err.code().as_str(), "INVALID_NAME", "{bad}");
    }
    assert!(reg.metric_names().is_empty());
}

#[test]
fn idempotent_registration_shares_state() {
    let reg = Registry::new();
    let a = reg.register_counter("jobs_total", "Jobs.").unwrap();
    let b = reg.register_counter("jobs_total", "Jobs.").unwrap();
    a.inc(&LabelSet::new());
    b.inc(&LabelSet::new());
    let snap = reg.snapshot();
    assert_eq!(snap.families.len(), 1);
    assert_eq!(snap.family("jobs_total").unwrap().value(&LabelSet::new()), Some(2.0));
}

#[test]
fn conflicting_registration_is_duplicate() {
    let reg = Registry::new();
    reg.register_counter("m", "Help.").unwrap();

    let err = reg.register_counter("m", "Other help.").err().unwrap();
    assert_eq!(err.code().as_str(), "DUPLICATE_METRIC");

    let err = reg
        .register("m", "Help.", MetricKind::histogram(vec![1.0]))
        .err()
        .unwrap();
    assert_eq!(err.code().as_str(), "DUPLICATE_METRIC");

    reg.register_histogram("h", "H.", vec![1.0, 2.0]).unwrap();
    let err = reg.register_histogram("h", "H.", vec![1.0, 3.0]).err().unwrap();
    assert_eq!(err.code().as_str(), "DUPLICATE_METRIC");

    // trailing +Inf is implicit, so this is the same layout
    reg.register_histogram("h", "H.", vec![1.0, 2.0, f64::INFINITY])
        .unwrap();
}

#[test]
fn register_returns_typed_handle() {
    let reg = Registry::new();
    match reg.register("lat", "L.", MetricKind::histogram(vec![0.5])).unwrap() {
        Metric::Histogram(h) => assert_eq!(h.name(), "lat"),
        Metric::Counter(_) => panic!("expected histogram"),
    }
    let m = reg.register("c_total", "C.", MetricKind::Counter).unwrap();
    assert_eq!(m.metric_type(), MetricType::Counter);
    assert_eq!(m.name(), "c_total");
}

#[test]
fn invalid_buckets_rejected() {
    let reg = Registry::new();
    let err = reg.register_histogram("h", "H.", vec![2.0, 1.0]).err().unwrap();
    assert_eq!(err.code().as_str(), "INVALID_BUCKETS");
    assert!(reg.metric_names().is_empty());
}

#[test]
fn unknown_metric_leaves_state_unchanged() {
    let reg = Registry::new();
    reg.register_counter("jobs_total", "Jobs.").unwrap();
    reg.inc("jobs_total", &LabelSet::new());
    let before = reg.render().unwrap();

    let err = reg
        .try_counter_increment("nope_total", &LabelSet::new(), 1.0)
        .unwrap_err();
    assert_eq!(err.code().as_str(), "UNKNOWN_METRIC");
    assert!(err.is_observation_error());

    reg.histogram_observe("nope_seconds", &LabelSet::new(), 0.1);
    reg.inc("nope_total", &LabelSet::new());

    assert_eq!(reg.render().unwrap(), before);
    assert_eq!(reg.dropped_observations(), 2);
}

#[test]
fn wrong_kind_is_reported() {
    let reg = Registry::new();
    reg.register_counter("c_total", "C.").unwrap();
    reg.register_histogram("h", "H.", vec![1.0]).unwrap();

    let err = reg.try_histogram_observe("c_total", &LabelSet::new(), 1.0).unwrap_err();
    assert_eq!(err.code().as_str(), "WRONG_KIND");
    let err = reg.try_counter_increment("h", &LabelSet::new(), 1.0).unwrap_err();
    assert_eq!(err.code().as_str(), "WRONG_KIND");

    let err = reg.register_counter("h", "H.").err().unwrap();
    assert_eq!(err.code().as_str(), "DUPLICATE_METRIC");
}

#[test]
fn negative_or_nan_delta_rejected() {
    let reg = Registry::new();
    let c = reg.register_counter("c_total", "C.").unwrap();
    let none = LabelSet::new();
    for bad in [-1.0, f64::NAN, f64::INFINITY] {
        let err = reg.try_counter_increment("c_total", &none, bad).unwrap_err();
        assert_eq!(err.code().as_str(), "INVALID_DELTA");
        assert!(c.try_inc_by(&none, bad).is_err());
    }
    c.inc_by(&none, -5.0);
    assert_eq!(reg.dropped_observations(), 1);
    // rejected updates never create the series
    assert_eq!(reg.snapshot().family("c_total").unwrap().series_len(), 0);
}

#[test]
fn non_finite_observation_rejected() {
    let reg = Registry::new();
    reg.register_histogram("h", "H.", vec![1.0]).unwrap();
    let err = reg
        .try_histogram_observe("h", &LabelSet::new(), f64::NAN)
        .unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_OBSERVATION");
}

#[test]
fn le_label_reserved_on_histograms() {
    let reg = Registry::new();
    let h = reg.register_histogram("h", "H.", vec![1.0]).unwrap();
    let labels = LabelSet::new().with("le", "1").unwrap();
    let err = h.try_observe(&labels, 0.5).unwrap_err();
    assert_eq!(err.code().as_str(), "INVALID_LABEL");

    assert!(Registry::builder().default_labels(labels).is_err());
}

#[test]
fn series_are_independent_per_label_set() {
    let reg = Registry::new();
    let c = reg.register_counter("http_total", "Requests.").unwrap();
    let get = LabelSet::from_pairs(&[("method", "GET")]).unwrap();
    let post = LabelSet::from_pairs(&[("method", "POST")]).unwrap();
    c.inc(&get);
    c.inc(&get);
    c.inc_by(&post, 3.0);

    let snap = reg.snapshot();
    let fam = snap.family("http_total").unwrap();
    assert_eq!(fam.series_len(), 2);
    assert_eq!(fam.value(&get), Some(2.0));
    assert_eq!(fam.value(&post), Some(3.0));
}

#[test]
fn default_labels_applied_series_wins() {
    let reg = Registry::builder()
        .default_labels(LabelSet::from_pairs(&[("service", "demo"), ("zone", "a")]).unwrap())
        .unwrap()
        .build();
    reg.register_counter("c_total", "C.").unwrap();
    reg.inc("c_total", &LabelSet::new());
    reg.inc("c_total", &LabelSet::new().with("zone", "b").unwrap());

    let out = reg.render().unwrap();
    assert!(out.contains("c_total{service=\"demo\",zone=\"a\"} 1\n"), "{out}");
    assert!(out.contains("c_total{service=\"demo\",zone=\"b\"} 1\n"), "{out}");
    assert_eq!(reg.default_labels().get("service"), Some("demo"));
}

#[test]
fn default_labels_do_not_split_series() {
    let reg = Registry::builder()
        .default_labels(LabelSet::from_pairs(&[("service", "demo")]).unwrap())
        .unwrap()
        .build();
    reg.register_counter("c_total", "C.").unwrap();
    reg.register_histogram("lat_seconds", "Lat.", vec![1.0]).unwrap();

    let explicit = LabelSet::new().with("service", "demo").unwrap();
    reg.inc("c_total", &LabelSet::new());
    reg.inc("c_total", &explicit);
    reg.histogram_observe("lat_seconds", &LabelSet::new(), 0.5);
    reg.histogram_observe("lat_seconds", &explicit, 0.5);

    let snap = reg.snapshot();
    assert_eq!(snap.family("c_total").unwrap().series_len(), 1);
    assert_eq!(snap.family("c_total").unwrap().value(&explicit), Some(2.0));
    assert_eq!(snap.family("lat_seconds").unwrap().series_len(), 1);

    let out = reg.render().unwrap();
    assert_eq!(out.matches("c_total{service=\"demo\"} 2\n").count(), 1, "{out}");
    assert_eq!(out.matches("c_total{").count(), 1, "{out}");
    assert_eq!(out.matches("lat_seconds_count{service=\"demo\"} 2\n").count(), 1, "{out}");
}

#[test]
fn process_gauges_rendered_after_registered_metrics() {
    let reg = Registry::builder()
        .process_collector(
            StaticCollector::new()
                .gauge("process_resident_memory_bytes", "Resident memory size in bytes.", 4096.0)
                .gauge("process_uptime_seconds", "Seconds since the process started.", 12.5),
        )
        .build();
    reg.register_counter("jobs_total", "Jobs.").unwrap();

    let gauges = reg.collect_process_metrics();
    assert_eq!(gauges.len(), 2);

    let out = reg.render().unwrap();
    assert!(out.contains(
        "# TYPE process_resident_memory_bytes gauge\nprocess_resident_memory_bytes 4096\n"
    ));
    assert!(out.contains("process_uptime_seconds 12.5\n"));
    assert!(out.find("jobs_total").unwrap() < out.find("process_").unwrap());
}

#[test]
fn process_gauge_colliding_with_registered_name_is_skipped() {
    let reg = Registry::builder()
        .process_collector(
            StaticCollector::new()
                .gauge("jobs_total", "Shadowed.", 1.0)
                .gauge("bad name", "Invalid.", 1.0)
                .gauge("process_open_fds", "Number of open file descriptors.", 7.0),
        )
        .build();
    reg.register_counter("jobs_total", "Jobs.").unwrap();

    let names: Vec<String> = reg
        .collect_process_metrics()
        .into_iter()
        .map(|f| f.name)
        .collect();
    assert_eq!(names, vec!["process_open_fds"]);
    assert!(!reg.render().unwrap().contains("Shadowed."));
}

#[test]
fn render_metric_unknown() {
    let reg = Registry::new();
    let err = reg.render_metric("missing").unwrap_err();
    assert_eq!(err.code().as_str(), "UNKNOWN_METRIC");
    assert_eq!(reg.content_type(), "text/plain; version=0.0.4; charset=utf-8");
}
