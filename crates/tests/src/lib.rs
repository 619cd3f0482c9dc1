//! # Integration Tests
//!
//! Cross-crate and end-to-end tests.
//!
//! Covers:
//! - Channel and filter behaviour seen from outside the ingestion crate
//! - Mock-backed dispatcher runs (single consumer and fan-out)
//! - GRO files on disk through config loading, dispatcher and file consumer

#[cfg(test)]
mod support {
    use std::sync::{Arc, Mutex};

    use contracts::{Consumer, ContractError, FrameMetadata, MolecularSystem, SharedEnvelope};

    /// Everything a `Recorder` saw
    #[derive(Debug, Default, Clone)]
    pub struct Seen {
        pub metas: Vec<FrameMetadata>,
        pub last: Option<Option<FrameMetadata>>,
        pub system_atoms: usize,
    }

    impl Seen {
        pub fn frames(&self) -> Vec<u64> {
            self.metas.iter().map(|m| m.absolute_frame).collect()
        }
    }

    /// Consumer that records metadata into a shared log
    pub struct Recorder {
        name: String,
        system: MolecularSystem,
        seen: Arc<Mutex<Seen>>,
    }

    impl Recorder {
        pub fn boxed(name: &str) -> (Box<dyn Consumer>, Arc<Mutex<Seen>>) {
            let seen = Arc::new(Mutex::new(Seen::default()));
            let recorder = Self {
                name: name.to_string(),
                system: MolecularSystem::new(),
                seen: Arc::clone(&seen),
            };
            (Box::new(recorder), seen)
        }
    }

    impl Consumer for Recorder {
        fn name(&self) -> &str {
            &self.name
        }

        fn system_mut(&mut self) -> &mut MolecularSystem {
            &mut self.system
        }

        fn pre_process(&mut self) -> Result<(), ContractError> {
            self.seen.lock().unwrap().system_atoms = self.system.num_atoms();
            Ok(())
        }

        fn consume_frame(&mut self, envelope: &SharedEnvelope) -> Result<(), ContractError> {
            self.seen.lock().unwrap().metas.push(envelope.meta);
            Ok(())
        }

        fn post_process(&mut self, last: Option<&FrameMetadata>) -> Result<(), ContractError> {
            self.seen.lock().unwrap().last = Some(last.copied());
            Ok(())
        }
    }

    /// Snapshot of a shared log
    pub fn seen(log: &Arc<Mutex<Seen>>) -> Seen {
        log.lock().unwrap().clone()
    }
}

#[cfg(test)]
mod contract_tests {
    use contracts::SelectionRange;
    use ingestion::{Channel, FrameFilter};

    #[test]
    fn test_skip_below_one_disables_subsampling() {
        for skip in [0, -3] {
            let filter = FrameFilter::new(SelectionRange {
                skip: Some(skip),
                ..Default::default()
            });
            assert!((0..10).all(|i| filter.is_frame_valid(i, i as f64)));
        }
    }

    #[test]
    fn test_stride_keeps_multiples_of_skip() {
        let filter = FrameFilter::new(SelectionRange {
            skip: Some(3),
            ..Default::default()
        });
        let kept: Vec<u64> = (0..10).filter(|&i| filter.is_frame_valid(i, 0.0)).collect();
        assert_eq!(kept, vec![0, 3, 6, 9]);
    }

    #[test]
    fn test_receive_after_stop_drains_then_ends() {
        let channel = Channel::bounded(2);
        assert!(channel.send(1));
        channel.send_stop();

        assert!(!channel.send(2));
        assert_eq!(channel.receive(), Some(1));
        assert_eq!(channel.receive(), None);
        assert_eq!(channel.receive(), None);
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use contracts::SelectionRange;
    use dispatcher::{Dispatcher, DispatcherConfig, DispatcherError};
    use ingestion::{MockFileConfig, MockTrajectory, StopReason};

    use crate::support::{seen, Recorder};

    fn build(mock: &MockTrajectory, files: &[&str], range: SelectionRange) -> Dispatcher {
        let mut config = DispatcherConfig::new(files.iter().map(PathBuf::from).collect());
        config.range = range;
        config.buffer_size = 2;
        Dispatcher::new(config).with_opener(Arc::new(mock.clone()))
    }

    fn three_files() -> MockTrajectory {
        MockTrajectory::new()
            .file("a.xtc", MockFileConfig::frames(4))
            .file("b.xtc", MockFileConfig::frames(2))
            .file("c.xtc", MockFileConfig::frames(3))
    }

    #[test]
    fn test_indices_are_global_across_files() {
        let mock = three_files();
        let mut dispatcher = build(&mock, &["a.xtc", "b.xtc", "c.xtc"], SelectionRange::default());
        let (consumer, log) = Recorder::boxed("rec");
        dispatcher.add_consumer(consumer);

        let report = dispatcher.run().unwrap();
        let seen = seen(&log);

        assert_eq!(seen.frames(), (0..9).collect::<Vec<_>>());
        let valid: Vec<u64> = seen.metas.iter().map(|m| m.valid_frame).collect();
        assert_eq!(valid, (0..9).collect::<Vec<_>>());
        assert_eq!(report.stop_reason, StopReason::Exhausted);
        assert_eq!(seen.last.unwrap().unwrap().absolute_frame, 8);
    }

    #[test]
    fn test_custom_time_follows_absolute_index() {
        let mock = three_files();
        let range = SelectionRange {
            custom_start_time: Some(10.0),
            custom_dt: Some(2.0),
            ..Default::default()
        };
        let mut dispatcher = build(&mock, &["a.xtc", "b.xtc", "c.xtc"], range);
        let (consumer, log) = Recorder::boxed("rec");
        dispatcher.add_consumer(consumer);
        dispatcher.run().unwrap();

        let metas = seen(&log).metas;
        assert_eq!(metas[5].absolute_frame, 5);
        assert_eq!(metas[5].absolute_time, 20.0);
        assert_eq!(metas[0].first_time, 10.0);
    }

    #[test]
    fn test_range_and_stride_metadata() {
        let mock = three_files();
        let range = SelectionRange {
            first_frame: Some(1),
            skip: Some(2),
            window_size_frames: Some(5),
            ..Default::default()
        };
        let mut dispatcher = build(&mock, &["a.xtc", "b.xtc", "c.xtc"], range);
        let (consumer, log) = Recorder::boxed("rec");
        dispatcher.add_consumer(consumer);
        let report = dispatcher.run().unwrap();

        let metas = seen(&log).metas;
        let frames: Vec<u64> = metas.iter().map(|m| m.absolute_frame).collect();
        assert_eq!(frames, vec![2, 4, 6, 8]);
        assert!(metas.iter().all(|m| m.first_frame == 2));
        assert_eq!(metas[3].valid_frame, 3);
        assert_eq!(metas[3].last_frame, 8);
        assert_eq!(metas[0].window_size_frames, Some(5));
        assert_eq!(report.frames_accepted, 4);
        assert_eq!(report.frames_read, 9);
    }

    #[test]
    fn test_end_of_interval_stops_before_next_file() {
        let mock = MockTrajectory::new()
            .file("a.xtc", MockFileConfig::frames(5))
            .file("b.xtc", MockFileConfig::frames(5));
        let range = SelectionRange {
            last_frame: Some(3),
            ..Default::default()
        };
        let mut dispatcher = build(&mock, &["a.xtc", "b.xtc"], range);
        let (consumer, log) = Recorder::boxed("rec");
        dispatcher.add_consumer(consumer);

        let report = dispatcher.run().unwrap();
        assert_eq!(seen(&log).frames(), vec![0, 1, 2, 3]);
        assert_eq!(report.stop_reason, StopReason::EndOfInterval);
        assert_eq!(mock.open_count(), 1);
    }

    #[test]
    fn test_inverted_range_rejected_before_io() {
        let mock = three_files();
        let range = SelectionRange {
            first_time: Some(5.0),
            last_time: Some(1.0),
            ..Default::default()
        };
        let mut dispatcher = build(&mock, &["a.xtc"], range);
        let (consumer, log) = Recorder::boxed("rec");
        dispatcher.add_consumer(consumer);

        let err = dispatcher.run().unwrap_err();
        assert!(matches!(err, DispatcherError::Configuration(_)));
        assert_eq!(mock.open_count(), 0);
        assert!(seen(&log).last.is_none());
    }

    #[test]
    fn test_fan_out_delivers_every_frame_to_every_consumer() {
        let mock = three_files();
        let mut dispatcher = build(&mock, &["a.xtc", "b.xtc", "c.xtc"], SelectionRange::default());
        let logs: Vec<_> = ["A", "B", "C"]
            .iter()
            .map(|name| {
                let (consumer, log) = Recorder::boxed(name);
                dispatcher.add_consumer(consumer);
                log
            })
            .collect();

        let report = dispatcher.run().unwrap();
        assert!(report.fan_out);
        let names: Vec<&str> = report.consumers.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);

        for log in &logs {
            let seen = seen(log);
            assert_eq!(seen.frames(), (0..9).collect::<Vec<_>>());
            assert_eq!(seen.last.unwrap().unwrap().absolute_frame, 8);
        }
        assert_eq!(dispatcher.consumer_count(), 3);
    }

    #[test]
    fn test_single_and_fan_out_see_identical_metadata() {
        let range = SelectionRange {
            first_time: Some(1.0),
            skip: Some(2),
            custom_dt: Some(0.5),
            ..Default::default()
        };
        let files = ["a.xtc", "b.xtc", "c.xtc"];

        let mock = three_files();
        let mut single = build(&mock, &files, range);
        let (consumer, single_log) = Recorder::boxed("only");
        single.add_consumer(consumer);
        single.run().unwrap();

        let mock = three_files();
        let mut fan_out = build(&mock, &files, range);
        let (first, fan_out_log) = Recorder::boxed("first");
        let (second, _) = Recorder::boxed("second");
        fan_out.add_consumer(first);
        fan_out.add_consumer(second);
        fan_out.run().unwrap();

        let single = seen(&single_log);
        let fanned = seen(&fan_out_log);
        assert!(!single.metas.is_empty());
        assert_eq!(single.metas, fanned.metas);
        assert_eq!(single.last, fanned.last);
    }

    #[test]
    fn test_read_failure_delivers_prefix_to_all() {
        let mock = MockTrajectory::new()
            .file("a.xtc", MockFileConfig::frames(3))
            .file("b.xtc", MockFileConfig::frames(10).fail_after(2));
        let mut dispatcher = build(&mock, &["a.xtc", "b.xtc"], SelectionRange::default());
        let (first, first_log) = Recorder::boxed("first");
        let (second, second_log) = Recorder::boxed("second");
        dispatcher.add_consumer(first);
        dispatcher.add_consumer(second);

        let report = dispatcher.run().unwrap();
        assert_eq!(report.stop_reason, StopReason::ReadError);
        assert!(report.read_error.is_some());
        for log in [&first_log, &second_log] {
            let seen = seen(log);
            assert_eq!(seen.frames(), vec![0, 1, 2, 3, 4]);
            assert_eq!(seen.last.unwrap().unwrap().absolute_frame, 4);
        }
    }

    #[test]
    fn test_missing_file_ends_stream_without_error() {
        let mock = MockTrajectory::new().file("a.xtc", MockFileConfig::frames(2));
        let mut dispatcher = build(&mock, &["a.xtc", "missing.xtc"], SelectionRange::default());
        let (consumer, log) = Recorder::boxed("rec");
        dispatcher.add_consumer(consumer);

        let report = dispatcher.run().unwrap();
        assert_eq!(report.stop_reason, StopReason::ReadError);
        assert_eq!(seen(&log).frames(), vec![0, 1]);
    }

    #[test]
    fn test_nothing_accepted_calls_post_process_with_none() {
        let mock = three_files();
        let range = SelectionRange {
            first_frame: Some(100),
            ..Default::default()
        };
        let mut dispatcher = build(&mock, &["a.xtc", "b.xtc", "c.xtc"], range);
        let (consumer, log) = Recorder::boxed("rec");
        dispatcher.add_consumer(consumer);

        let report = dispatcher.run().unwrap();
        assert_eq!(report.frames_accepted, 0);
        assert_eq!(seen(&log).last, Some(None));
    }
}

#[cfg(test)]
mod file_tests {
    use std::fmt::Write as _;
    use std::fs;
    use std::path::{Path, PathBuf};

    use config_loader::{ConfigFormat, ConfigLoader};
    use dispatcher::consumers::{read_bincode_records, read_json_records, FileSummary};
    use dispatcher::{DispatcherBuilder, DispatcherError};
    use tempfile::tempdir;

    use crate::support::{seen, Recorder};

    /// GRO file with `frames` frames of a 3-site water, `t = 10 * i`
    fn write_water(dir: &Path, name: &str, frames: usize) -> PathBuf {
        let mut text = String::new();
        for i in 0..frames {
            writeln!(text, "Water t= {}.00000 step= {}", i * 10, i).unwrap();
            text.push_str("    3\n");
            for (a, atom) in ["OW", "HW1", "HW2"].iter().enumerate() {
                writeln!(
                    text,
                    "{:5}{:<5}{:>5}{:5}{:8.3}{:8.3}{:8.3}",
                    1,
                    "SOL",
                    atom,
                    a + 1,
                    i as f32 * 0.01 + a as f32 * 0.1,
                    0.5,
                    0.5
                )
                .unwrap();
            }
            text.push_str("   2.00000   2.00000   2.00000\n");
        }
        let path = dir.join(name);
        fs::write(&path, text).unwrap();
        path
    }

    fn config_toml(structure: &Path, trajectories: &[PathBuf], out: &Path, extra: &str) -> String {
        let list: Vec<String> = trajectories
            .iter()
            .map(|p| format!("\"{}\"", p.display()))
            .collect();
        format!(
            r#"
[input]
structure = "{structure}"
trajectories = [{list}]

{extra}

[[consumers]]
name = "jsonl"
kind = "file"
params = {{ base_path = "{out}", format = "json" }}

[[consumers]]
name = "binary"
kind = "file"
params = {{ base_path = "{out}", format = "bincode" }}
"#,
            structure = structure.display(),
            list = list.join(", "),
            out = out.display(),
        )
    }

    #[test]
    fn test_gro_files_to_file_consumers() {
        let dir = tempdir().unwrap();
        let first = write_water(dir.path(), "part1.gro", 3);
        let second = write_water(dir.path(), "part2.gro", 3);
        let out = dir.path().join("out");

        let toml = config_toml(
            &first,
            &[first.clone(), second],
            &out,
            "[range]\nfirst_frame = 1\nlast_frame = 4",
        );
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();
        let mut dispatcher = DispatcherBuilder::new(&config).build().unwrap();
        assert_eq!(dispatcher.consumer_count(), 2);

        let report = dispatcher.run().unwrap();
        assert_eq!(report.frames_accepted, 4);
        assert_eq!(report.consumers.len(), 2);

        let json = read_json_records(&out.join("jsonl").join("frames.jsonl")).unwrap();
        let bin = read_bincode_records(&out.join("binary").join("frames.bin")).unwrap();
        assert_eq!(json, bin);
        let frames: Vec<u64> = json.iter().map(|r| r.meta.absolute_frame).collect();
        assert_eq!(frames, vec![1, 2, 3, 4]);
        // Frame 3 is the first frame of the second file, embedded t = 0
        assert_eq!(json[2].meta.absolute_time, 0.0);
        assert_eq!(json[0].num_atoms, 3);
        assert_eq!(json[0].box_extents, [2.0, 2.0, 2.0]);

        for name in ["jsonl", "binary"] {
            let summary: FileSummary = serde_json::from_str(
                &fs::read_to_string(out.join(name).join("summary.json")).unwrap(),
            )
            .unwrap();
            assert_eq!(summary.frames_written, 4);
            assert_eq!(summary.system_atoms, 3);
            assert_eq!(summary.last.unwrap().absolute_frame, 4);
        }
    }

    #[test]
    fn test_structure_seeds_every_consumer() {
        let dir = tempdir().unwrap();
        let traj = write_water(dir.path(), "md.gro", 2);
        let toml = config_toml(&traj, &[traj.clone()], &dir.path().join("out"), "");
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let mut dispatcher = DispatcherBuilder::new(&config).build().unwrap();
        let (consumer, log) = Recorder::boxed("late");
        dispatcher.add_consumer(consumer);
        dispatcher.run().unwrap();

        // The recorder is consumer #2 and only receives a copy of #0's system
        let seen = seen(&log);
        assert_eq!(seen.system_atoms, 3);
        assert_eq!(seen.frames(), vec![0, 1]);
        assert_eq!(dispatcher.consumers().len(), 3);
    }

    #[test]
    fn test_topology_without_loader_fails_at_seeding() {
        let dir = tempdir().unwrap();
        let traj = write_water(dir.path(), "md.gro", 1);
        let toml = config_toml(&traj, &[traj.clone()], &dir.path().join("out"), "")
            .replace("[input]\n", "[input]\ntopology = \"topol.tpr\"\n");
        let config = ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).unwrap();

        let mut dispatcher = DispatcherBuilder::new(&config).build().unwrap();
        let err = dispatcher.run().unwrap_err();
        assert!(matches!(err, DispatcherError::SystemLoad(_)));
    }

    #[test]
    fn test_invalid_config_rejected_by_loader() {
        let dir = tempdir().unwrap();
        let traj = write_water(dir.path(), "md.gro", 1);
        let toml = config_toml(
            &traj,
            &[traj.clone()],
            &dir.path().join("out"),
            "[range]\nfirst_frame = 5\nlast_frame = 2",
        );
        assert!(ConfigLoader::load_from_str(&toml, ConfigFormat::Toml).is_err());
    }
}
