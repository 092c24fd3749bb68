// Integration tests for catalog -> theme directory builds

#[cfg(test)]
mod tests {
    use crate::catalog::{ComponentRecord, SpriteCatalog};
    use crate::error::ThemeError;
    use crate::model::{AliasRule, ThemeConfig};
    use crate::pipeline::raster::{Rasterizer, ResvgRasterizer};
    use crate::pipeline::runner::ThemeBuilder;
    use crate::pipeline::xcursor_reader::XcursorFile;
    use crate::source::{DesignSource, LocalSource};
    use anyhow::{Result, bail};
    use image::{Rgba, RgbaImage};
    use std::fs;
    use std::path::Path;
    use tempfile::tempdir;

    const ARROW: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24" viewBox="0 0 24 24">
        <g id="arrow">
            <path d="M4 2 L12 10 L4 14 Z" fill="#202020"/>
        </g>
        <rect id="hotspot" x="4" y="2" width="1" height="1"/>
    </svg>"##;

    const SPINNER: &str = r##"
        [[animations]]
        selector = "#arrow"
        instructions = [
          { name = "animate", arguments = [1000] },
          { name = "rotate", arguments = [360] },
        ]
    "##;

    /// Solid 24 unit squares; fails for documents containing `broken`.
    struct SolidRasterizer;

    impl Rasterizer for SolidRasterizer {
        fn rasterize(&self, svg: &str, scale: u32) -> Result<RgbaImage> {
            if svg.contains("broken") {
                bail!("refusing to render");
            }
            Ok(RgbaImage::from_pixel(24 * scale, 24 * scale, Rgba([255, 0, 0, 128])))
        }
    }

    fn config() -> ThemeConfig {
        ThemeConfig {
            name: "Test Theme".into(),
            comment: Some("Built in a test".into()),
            scales: vec![1, 2],
            left_handed: false,
            aliases: vec![AliasRule::new("watch", "wait"), AliasRule::new("ghost", "nope")],
            ..ThemeConfig::default()
        }
    }

    fn write_source(dir: &Path) {
        fs::write(dir.join("cursor=left_ptr, variant=default, size=24.svg"), ARROW).unwrap();
        fs::write(dir.join("cursor=wait, variant=default, size=24.svg"), ARROW).unwrap();
        fs::write(dir.join("cursor=wait, variant=default, size=24.toml"), SPINNER).unwrap();
        fs::write(
            dir.join("cursor=left_ptr, variant=hover, size=24, duration=120.svg"),
            ARROW,
        )
        .unwrap();
    }

    fn build(source: &Path, output: &Path, rasterizer: &dyn Rasterizer) -> crate::pipeline::BuildReport {
        let records = LocalSource::new(source).components().unwrap();
        let catalog = SpriteCatalog::from_records(records).unwrap();
        let config = config();
        ThemeBuilder::new(&config, rasterizer)
            .with_threads(2)
            .run(&catalog, output)
            .unwrap()
    }

    #[test]
    fn builds_theme_directories_with_links_and_aliases() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_source(source.path());

        let report = build(source.path(), output.path(), &SolidRasterizer);
        assert!(report.is_success(), "failures: {:?}", report.failures);
        assert_eq!(report.variants.len(), 2);
        assert_eq!(report.written.len(), 3);

        let default_dir = output.path().join("test-theme");
        let hover_dir = output.path().join("test-theme-hover");
        assert_eq!(report.variants[0], default_dir);

        let index = fs::read_to_string(default_dir.join("index.theme")).unwrap();
        assert_eq!(index, "[Icon Theme]\nName=Test Theme\nComment=Built in a test\n");
        let index = fs::read_to_string(hover_dir.join("index.theme")).unwrap();
        assert!(index.contains("Name=Test Theme - hover\n"));

        // hover has no wait of its own
        let wait_link = hover_dir.join("cursors/wait");
        assert!(fs::symlink_metadata(&wait_link).unwrap().file_type().is_symlink());
        assert_eq!(
            fs::read_link(&wait_link).unwrap(),
            Path::new("../../test-theme/cursors/wait")
        );
        assert_eq!(
            fs::read(&wait_link).unwrap(),
            fs::read(default_dir.join("cursors/wait")).unwrap()
        );

        for dir in [&default_dir, &hover_dir] {
            let watch = dir.join("cursors/watch");
            assert_eq!(fs::read_link(&watch).unwrap(), Path::new("wait"));
            assert!(watch.exists());
            assert!(!dir.join("cursors/ghost").exists());
        }
        assert_eq!(
            report
                .warnings
                .iter()
                .filter(|w| w.contains("`ghost`") && w.contains("`nope`"))
                .count(),
            2
        );
    }

    #[test]
    fn encodes_frames_sizes_and_hotspots() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_source(source.path());
        build(source.path(), output.path(), &SolidRasterizer);

        let wait = XcursorFile::from_file(&output.path().join("test-theme/cursors/wait")).unwrap();
        assert_eq!(wait.sizes(), vec![24, 48]);
        assert_eq!(wait.images.len(), 60);

        let small = wait.images_for_size(24);
        assert_eq!(small.len(), 30);
        assert_eq!(small.iter().map(|i| i.delay).sum::<u32>(), 1000);
        assert!(small.iter().all(|i| (i.xhot, i.yhot) == (5, 3)));

        let large = wait.images_for_size(48);
        assert_eq!(large.len(), 30);
        assert!(large.iter().all(|i| i.width == 48 && (i.xhot, i.yhot) == (10, 6)));
        // premultiplied BGRA of (255, 0, 0, 128)
        assert_eq!(&large[0].pixels[..4], &[0, 0, 128, 128]);

        let pointer = XcursorFile::from_file(&output.path().join("test-theme/cursors/left_ptr")).unwrap();
        assert_eq!(pointer.images.len(), 2);
        assert!(pointer.images.iter().all(|i| i.delay == 50));

        let hover = XcursorFile::from_file(&output.path().join("test-theme-hover/cursors/left_ptr")).unwrap();
        assert!(hover.images.iter().all(|i| i.delay == 120));
    }

    #[test]
    fn rebuild_is_byte_identical() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_source(source.path());

        build(source.path(), output.path(), &SolidRasterizer);
        let wait = output.path().join("test-theme/cursors/wait");
        let index = output.path().join("test-theme-hover/index.theme");
        let first = (fs::read(&wait).unwrap(), fs::read(&index).unwrap());

        let report = build(source.path(), output.path(), &SolidRasterizer);
        assert!(report.is_success());
        assert_eq!(first, (fs::read(&wait).unwrap(), fs::read(&index).unwrap()));
        assert_eq!(
            fs::read_link(output.path().join("test-theme-hover/cursors/wait")).unwrap(),
            Path::new("../../test-theme/cursors/wait")
        );
    }

    #[test]
    fn failed_cursor_is_reported_and_skipped() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_source(source.path());
        let broken = ARROW.replace("id=\"arrow\"", "id=\"broken\"");
        fs::write(source.path().join("cursor=text, variant=default, size=24.svg"), broken).unwrap();

        let report = build(source.path(), output.path(), &SolidRasterizer);
        assert!(!report.is_success());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].cursor, "text");
        assert!(!report.failures[0].error.is_fatal());

        assert!(output.path().join("test-theme/cursors/wait").is_file());
        assert!(!output.path().join("test-theme/cursors/text").exists());
        // the hover fallback to the failed cursor is not created
        assert!(
            fs::symlink_metadata(output.path().join("test-theme-hover/cursors/text")).is_err()
        );
        assert!(report.warnings.iter().any(|w| w.contains("`text`")));
    }

    #[test]
    fn failed_rebuild_removes_stale_output() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        write_source(source.path());
        let text = source.path().join("cursor=text, variant=default, size=24.svg");
        fs::write(&text, ARROW).unwrap();

        let report = build(source.path(), output.path(), &SolidRasterizer);
        assert!(report.is_success(), "failures: {:?}", report.failures);
        let hover_text = output.path().join("test-theme-hover/cursors/text");
        assert!(hover_text.exists());

        fs::write(&text, ARROW.replace("id=\"arrow\"", "id=\"broken\"")).unwrap();
        let report = build(source.path(), output.path(), &SolidRasterizer);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].cursor, "text");

        assert!(fs::symlink_metadata(output.path().join("test-theme/cursors/text")).is_err());
        assert!(fs::symlink_metadata(&hover_text).is_err());
        assert!(output.path().join("test-theme-hover/cursors/wait").exists());
    }

    #[test]
    fn input_errors_abort_before_writing() {
        let records = vec![ComponentRecord {
            id: "1:1".into(),
            name: "cursor=wait, variant=dark, size=24".into(),
            description: String::new(),
            svg: ARROW.into(),
        }];
        let catalog = SpriteCatalog::from_records(records).unwrap();
        let output = tempdir().unwrap();
        let config = config();

        let err = ThemeBuilder::new(&config, &SolidRasterizer)
            .run(&catalog, output.path())
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ThemeError>(),
            Some(ThemeError::MissingDefaultVariant)
        ));
        assert_eq!(fs::read_dir(output.path()).unwrap().count(), 0);
    }

    #[test]
    fn resvg_build_is_readable_by_xcursor() {
        let source = tempdir().unwrap();
        let output = tempdir().unwrap();
        fs::write(source.path().join("cursor=left_ptr, variant=default, size=24.svg"), ARROW).unwrap();

        let report = build(source.path(), output.path(), &ResvgRasterizer);
        assert!(report.is_success(), "failures: {:?}", report.failures);

        let data = fs::read(output.path().join("test-theme/cursors/left_ptr")).unwrap();
        let images = xcursor::parser::parse_xcursor(&data).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!((images[0].size, images[0].xhot, images[0].yhot), (24, 5, 3));
        assert_eq!((images[1].size, images[1].xhot, images[1].yhot), (48, 10, 6));
        assert!(images[0].pixels_rgba.chunks(4).any(|p| p[3] > 0));
    }
}
