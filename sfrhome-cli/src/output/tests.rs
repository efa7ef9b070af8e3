//! CLI output formatting tests.
//!
//! These tests verify the text table, the CSV layout and the file export.

#[cfg(test)]
mod text_formatter_tests {
    use super::super::text::TextFormatter;
    use sfrhome_core::{Device, DeviceSnapshot, FetchSource};

    fn sensor(id: &str, kind: &str, name: &str, battery: Option<&str>) -> Device {
        Device {
            id: Some(id.into()),
            device_type: Some(kind.into()),
            name: Some(name.into()),
            status: Some("OK".into()),
            battery_level: battery.map(Into::into),
            ..Device::default()
        }
    }

    #[test]
    fn test_summary_lists_devices() {
        let snapshot = DeviceSnapshot::new(
            vec![
                sensor("1001", "MAGNETIC", "Porte entree", Some("90")),
                sensor("1002", "PIR", "Couloir", Some("-2")),
            ],
            FetchSource::Sso,
        );

        let output = TextFormatter::new(false).format_summary(&snapshot);
        assert!(output.contains("SFR Home devices"));
        assert!(output.contains("MAGNETIC"));
        assert!(output.contains("Porte entree"));
        assert!(output.contains("90%"));
        assert!(output.contains("n/a"));
        assert!(output.contains("2 devices, 0 sensor values"));
        assert!(!output.contains("\x1b["));
    }

    #[test]
    fn test_summary_prefers_long_name() {
        let mut device = sensor("1001", "MAGNETIC", "Porte", None);
        device.long_name = Some("Detecteur porte entree".into());

        let row = TextFormatter::new(false).format_row(&device);
        assert!(row.contains("Detecteur porte entree"));
        assert!(row.trim_end().ends_with('-'));
    }

    #[test]
    fn test_summary_empty() {
        let snapshot = DeviceSnapshot::new(Vec::new(), FetchSource::LocalFile);
        let output = TextFormatter::new(false).format_summary(&snapshot);
        assert!(output.contains("No devices"));
    }

    #[test]
    fn test_colors_enabled() {
        let snapshot = DeviceSnapshot::new(
            vec![sensor("1", "PIR", "Salon", Some("10"))],
            FetchSource::StoredCookie,
        );
        let output = TextFormatter::new(true).format_summary(&snapshot);
        assert!(output.contains("\x1b[31m10%"));
    }

    #[test]
    fn test_format_error() {
        let output = TextFormatter::new(false).format_error("sfrhome.sso", "HTTP 500");
        assert_eq!(output, "sfrhome.sso: Error - HTTP 500");
    }
}

#[cfg(test)]
mod csv_tests {
    use super::super::csv::{write_csv, CSV_COLUMNS};
    use sfrhome_core::Device;

    #[test]
    fn test_header_and_rows() {
        let devices = vec![
            Device {
                id: Some("panel".into()),
                device_type: Some("ALARM_PANEL".into()),
                name: Some("Maison".into()),
                brand: Some("SFR HOME".into()),
                ..Device::default()
            },
            Device {
                id: Some("1002".into()),
                device_type: Some("CAMERA_WIFI".into()),
                name: Some("Camera, salon".into()),
                device_mac: Some("00:1D:2E:3F:40:51".into()),
                ..Device::default()
            },
        ];

        let mut buf = Vec::new();
        write_csv(&mut buf, &devices).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], CSV_COLUMNS.join(","));
        assert_eq!(lines[1], "panel,ALARM_PANEL,Maison,,,,,,SFR HOME,");
        assert_eq!(
            lines[2],
            "1002,CAMERA_WIFI,\"Camera, salon\",,,00:1D:2E:3F:40:51,,,,"
        );
    }

    #[test]
    fn test_empty_list_writes_header_only() {
        let mut buf = Vec::new();
        write_csv(&mut buf, &[]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text.lines().count(), 1);
    }
}

#[cfg(test)]
mod export_tests {
    use super::super::export::export_devices;
    use sfrhome_core::Device;
    use tempfile::TempDir;

    fn devices() -> Vec<Device> {
        vec![Device {
            id: Some("1001".into()),
            name: Some("Porte".into()),
            ..Device::default()
        }]
    }

    #[tokio::test]
    async fn test_export_writes_both_files() {
        let dir = TempDir::new().unwrap();
        let json = dir.path().join("out/devices.json");
        let csv = dir.path().join("out/devices.csv");

        let report = export_devices(&devices(), &json, &csv).await;
        assert!(report.failed.is_empty());
        assert_eq!(report.written.len(), 2);

        let parsed: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&json).unwrap()).unwrap();
        assert_eq!(parsed[0]["id"], "1001");
        assert!(std::fs::read_to_string(&csv).unwrap().starts_with("id,deviceType"));
    }

    #[tokio::test]
    async fn test_export_failure_is_reported() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"file").unwrap();

        // A regular file where a directory is needed.
        let json = blocker.join("devices.json");
        let csv = dir.path().join("devices.csv");

        let report = export_devices(&devices(), &json, &csv).await;
        assert_eq!(report.written, vec![csv]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, json);
    }
}
