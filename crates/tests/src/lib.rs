//! # Integration Tests
//!
//! Integration and end-to-end tests.
//!
//! Covers:
//! - Wire geometry of the reference camera
//! - Scheduled capture into real sinks (file, UDP)
//! - Skipped cycles and recovery across crate boundaries

#[cfg(test)]
mod contract_tests {
    use capture::{FrameCapturer, FrameConverter, SyntheticRenderTarget};
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::{ContractError, PixelFormat, RenderTarget, RowOrigin};
    use scheduler::PublishScheduler;

    /// 848x480 bottom-left target: rows are reversed and geometry matches
    /// the wire format exactly
    #[test]
    fn test_reference_camera_geometry() {
        let target = SyntheticRenderTarget::rendered_at(848, 480, RowOrigin::BottomLeft, 7);
        let capturer = FrameCapturer::new(848, 480).unwrap();
        let converter = FrameConverter::new(RowOrigin::BottomLeft);

        let mut raw_color = vec![0u8; PixelFormat::ColorRgb8.frame_len(848, 480)];
        target.read_color(&mut raw_color).unwrap();

        let frame = capturer.capture(&target).unwrap();
        let color = converter.convert(frame.color).unwrap();
        let depth = converter.convert(frame.depth).unwrap();

        assert_eq!(color.encoding(), "rgb8");
        assert_eq!(color.step(), 2544);
        assert_eq!(color.data().len(), 1_221_120);
        assert_eq!(color.row(0).unwrap(), &raw_color[479 * 2544..]);
        assert_eq!(color.row(479).unwrap(), &raw_color[..2544]);

        assert_eq!(depth.encoding(), "mono16");
        assert_eq!(depth.step(), 1696);
        assert_eq!(depth.data().len(), 814_080);
        assert_eq!((depth.width(), depth.height()), (848, 480));
    }

    #[test]
    fn test_zero_rate_never_schedules() {
        assert!(matches!(
            PublishScheduler::new(0.0),
            Err(ContractError::InvalidRate { .. })
        ));

        let result = ConfigLoader::load_from_str(
            "[camera]\ntexture_width = 848\ntexture_height = 480\npublish_rate = 0.0\n",
            ConfigFormat::Toml,
        );
        assert!(matches!(result, Err(ContractError::ConfigValidation { .. })));
    }
}

#[cfg(test)]
mod e2e_tests {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;
    use std::time::Duration;

    use capture::{
        FrameCapturer, FrameConverter, SharedRenderTarget, SyntheticRenderTarget,
        SyntheticRenderer, SyntheticRendererConfig,
    };
    use contracts::{Channel, ChannelsConfig, ImageMessage, RowOrigin, SinkConfig, SinkType};
    use dispatcher::ChannelDispatcher;
    use scheduler::{CaptureCycle, PublishScheduler};
    use tempfile::tempdir;

    fn sink(
        name: &str,
        channel: Channel,
        sink_type: SinkType,
        params: &[(&str, String)],
    ) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            channel,
            sink_type,
            queue_capacity: 16,
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect::<HashMap<_, _>>(),
        }
    }

    fn file_sink(name: &str, channel: Channel, base: &Path) -> SinkConfig {
        sink(
            name,
            channel,
            SinkType::File,
            &[
                ("base_path", base.display().to_string()),
                ("metadata", "false".to_string()),
            ],
        )
    }

    fn pngs_in(dir: &Path) -> Vec<PathBuf> {
        let mut files: Vec<_> = std::fs::read_dir(dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .map(|e| e.path())
                    .filter(|p| p.extension().is_some_and(|x| x == "png"))
                    .collect()
            })
            .unwrap_or_default();
        files.sort();
        files
    }

    fn cycle_for(
        target: SharedRenderTarget<SyntheticRenderTarget>,
        width: u32,
        height: u32,
        origin: RowOrigin,
        dispatcher: &ChannelDispatcher,
    ) -> Arc<CaptureCycle<SyntheticRenderTarget>> {
        Arc::new(
            CaptureCycle::new(
                target,
                FrameCapturer::new(width, height).unwrap(),
                FrameConverter::new(origin),
                dispatcher.publisher(Channel::Color),
                dispatcher.publisher(Channel::Depth),
            )
            .unwrap(),
        )
    }

    async fn run_cycles(
        scheduler: &PublishScheduler,
        cycle: Arc<CaptureCycle<SyntheticRenderTarget>>,
        n: u64,
    ) {
        let mut completed = scheduler.completed_cycles();
        scheduler.start_cycle(cycle);
        tokio::time::timeout(Duration::from_secs(5), completed.wait_for(|c| *c >= n))
            .await
            .expect("cycles did not complete in time")
            .unwrap();
        scheduler.stop().await;
    }

    /// Renderer -> CaptureCycle -> PublishScheduler -> Dispatcher -> FileSink
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_scheduled_capture_to_file_sinks() {
        let dir = tempdir().unwrap();
        let target =
            SharedRenderTarget::new(SyntheticRenderTarget::new(16, 8, RowOrigin::BottomLeft));
        let renderer = SyntheticRenderer::new(
            target.clone(),
            SyntheticRendererConfig {
                render_rate: 100.0,
                animate: true,
            },
        )
        .unwrap();
        renderer.start();

        let dispatcher = ChannelDispatcher::build(
            &ChannelsConfig::default(),
            &[
                file_sink("color_rec", Channel::Color, dir.path()),
                file_sink("depth_rec", Channel::Depth, dir.path()),
            ],
        )
        .await
        .unwrap();

        let cycle = cycle_for(target, 16, 8, RowOrigin::BottomLeft, &dispatcher);
        let stats = cycle.stats();
        let scheduler = PublishScheduler::new(25.0).unwrap();

        run_cycles(&scheduler, cycle, 3).await;
        dispatcher.shutdown().await;
        renderer.stop();

        let published = stats.lock().published_cycles;
        assert!(published >= 3);
        assert_eq!(dispatcher.fanout(Channel::Color).published_count(), published);

        let color_files = pngs_in(&dir.path().join("color_frame"));
        let depth_files = pngs_in(&dir.path().join("depth_frame"));
        assert_eq!(color_files.len() as u64, published);
        assert_eq!(depth_files.len() as u64, published);

        // Top image row after correction: green 0, nearest depth
        let color = image::open(&color_files[0]).unwrap().into_rgb8();
        assert_eq!(color.dimensions(), (16, 8));
        assert!((0..16).all(|x| color.get_pixel(x, 0).0[1] == 0));

        let depth = image::open(&depth_files[0]).unwrap().into_luma16();
        assert_eq!(depth.dimensions(), (16, 8));
        assert_eq!(depth.get_pixel(0, 0).0[0], 500);
        assert!(depth.get_pixel(0, 7).0[0] > 500);
    }

    /// Zero-width target: every cycle is skipped, the schedule keeps firing
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_zero_width_target_keeps_firing() {
        let dispatcher = ChannelDispatcher::build(
            &ChannelsConfig::default(),
            &[
                sink("color_log", Channel::Color, SinkType::Log, &[]),
                sink("depth_log", Channel::Depth, SinkType::Log, &[]),
            ],
        )
        .await
        .unwrap();

        let target = SharedRenderTarget::new(SyntheticRenderTarget::rendered_at(
            0,
            8,
            RowOrigin::TopLeft,
            0,
        ));
        let cycle = cycle_for(target, 16, 8, RowOrigin::TopLeft, &dispatcher);
        let stats = cycle.stats();
        let scheduler = PublishScheduler::new(50.0).unwrap();

        run_cycles(&scheduler, cycle, 3).await;
        dispatcher.shutdown().await;

        let stats = stats.lock();
        assert!(stats.total_cycles >= 3);
        assert_eq!(stats.capture_failures, stats.total_cycles);
        assert_eq!(stats.published_cycles, 0);
        assert_eq!(dispatcher.fanout(Channel::Color).published_count(), 0);
        assert_eq!(dispatcher.fanout(Channel::Depth).published_count(), 0);
    }

    /// Unchanged target: consecutive depth recordings are byte-identical
    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_e2e_static_target_records_identical_depth() {
        let dir = tempdir().unwrap();
        let dispatcher = ChannelDispatcher::build(
            &ChannelsConfig::default(),
            &[file_sink("depth_rec", Channel::Depth, dir.path())],
        )
        .await
        .unwrap();

        let target = SharedRenderTarget::new(SyntheticRenderTarget::rendered_at(
            12,
            6,
            RowOrigin::BottomLeft,
            4,
        ));
        let cycle = cycle_for(target, 12, 6, RowOrigin::BottomLeft, &dispatcher);
        let scheduler = PublishScheduler::new(25.0).unwrap();

        run_cycles(&scheduler, cycle, 2).await;
        dispatcher.shutdown().await;

        let files = pngs_in(&dir.path().join("depth_frame"));
        assert!(files.len() >= 2);
        let first = std::fs::read(&files[0]).unwrap();
        let second = std::fs::read(&files[1]).unwrap();
        assert_eq!(first, second);
    }

    /// One cycle streamed over UDP as JSON
    #[tokio::test]
    async fn test_e2e_network_sink_delivers_message() {
        let receiver = tokio::net::UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap();

        let dispatcher = ChannelDispatcher::build(
            &ChannelsConfig::default(),
            &[sink(
                "depth_udp",
                Channel::Depth,
                SinkType::Network,
                &[("addr", addr.to_string()), ("format", "json".to_string())],
            )],
        )
        .await
        .unwrap();

        let target = SharedRenderTarget::new(SyntheticRenderTarget::rendered_at(
            4,
            4,
            RowOrigin::BottomLeft,
            0,
        ));
        let cycle = cycle_for(target, 4, 4, RowOrigin::BottomLeft, &dispatcher);
        cycle.run_once();

        let mut buf = vec![0u8; 65_536];
        let len = tokio::time::timeout(Duration::from_secs(2), receiver.recv(&mut buf))
            .await
            .expect("no datagram received")
            .unwrap();
        dispatcher.shutdown().await;

        let message: ImageMessage = serde_json::from_slice(&buf[..len]).unwrap();
        assert_eq!(message.encoding(), "mono16");
        assert_eq!(message.step(), 8);
        assert_eq!(message.data().len(), 32);
        assert_eq!(&message.row(0).unwrap()[..2], &500u16.to_le_bytes());
    }
}
