// Animation engine: samples a sprite's declarative timeline into frames.

pub mod description;
pub mod document;
pub mod ease;
pub mod selector;
pub mod timeline;
pub mod transform;

pub use description::{AnimationSpec, Argument, InstructionSpec, SpriteDescription};
pub use document::{ElementOverride, NodeId, Snapshot, SvgDocument};
pub use ease::Ease;
pub use selector::Selector;
pub use timeline::Timeline;

use kurbo::{Affine, Point};
use tracing::{debug, warn};

use crate::error::{ThemeError, ThemeResult};
use crate::model::{Frame, Hotspot, SpriteKey};
use transform::about;

/// Frames sampled from one sprite record.
#[derive(Clone, Debug)]
pub struct SampledFrames {
    pub frames: Vec<Frame>,
    pub left_handed: Option<Vec<Frame>>,
}

/// One sample of the global clock: `(start_ms, duration_ms)`.
pub type FrameSlot = (u32, u32);

/// Splits `total_ms` into frames at `fps`. Frame `i` starts at
/// `floor(i * 1000 / fps)`; the last one is clipped so durations sum to
/// `total_ms` exactly. A zero total gives one zero-length slot.
pub fn sample_schedule(total_ms: u32, fps: u32) -> Vec<FrameSlot> {
    if total_ms == 0 || fps == 0 {
        return vec![(0, 0)];
    }
    let total = u64::from(total_ms);
    let fps = u64::from(fps);
    let count = (total * fps).div_ceil(1000);
    let start = |i: u64| (i * 1000 / fps) as u32;

    (0..count)
        .map(|i| {
            let begin = start(i);
            let end = if i + 1 == count { total_ms } else { start(i + 1) };
            (begin, end - begin)
        })
        .collect()
}

#[derive(Clone, Debug)]
pub struct AnimationEngine {
    pub fps: u32,
    pub hotspot_id: String,
}

impl AnimationEngine {
    pub fn new(fps: u32, hotspot_id: impl Into<String>) -> Self {
        Self {
            fps,
            hotspot_id: hotspot_id.into(),
        }
    }

    /// Samples `svg` under `description`. A static sprite yields a single
    /// frame whose duration is left at 0 for the caller to fill in.
    pub fn sample(&self, key: &SpriteKey, svg: &str, description: &SpriteDescription) -> ThemeResult<SampledFrames> {
        let sprite = key.to_string();
        let doc = SvgDocument::parse(svg).map_err(|reason| ThemeError::InvalidSvg {
            sprite: sprite.clone(),
            reason,
        })?;

        let (width, height) = doc.intrinsic_size().ok_or_else(|| ThemeError::InvalidSvg {
            sprite: sprite.clone(),
            reason: "root element has neither width/height nor a viewBox".to_string(),
        })?;
        if (width - height).abs() > 1e-6 {
            return Err(ThemeError::NonSquareSprite {
                sprite,
                width,
                height,
            });
        }
        if (width - f64::from(key.size)).abs() > 0.5 {
            return Err(ThemeError::SizeMismatch {
                sprite,
                declared: key.size,
                intrinsic: width,
            });
        }

        let timeline = Timeline::compile(&doc, description, &sprite)?;
        let flips = match description.flips.as_deref() {
            Some(selector) => Some(flip_targets(&doc, selector, &sprite)?),
            None => None,
        };

        let marker = doc.find_by_id(&self.hotspot_id);
        if marker.is_none() {
            warn!("{}: no `#{}` marker, hotspot defaults to 0,0", sprite, self.hotspot_id);
        }

        let total_ms = timeline.duration().round() as u32;
        let schedule = sample_schedule(total_ms, self.fps);
        debug!("{}: {} ms sampled into {} frames", sprite, total_ms, schedule.len());

        let mut frames = Vec::with_capacity(schedule.len());
        let mut mirrored = flips.as_ref().map(|_| Vec::with_capacity(schedule.len()));
        for (index, (_, duration_ms)) in schedule.iter().enumerate() {
            let t = index as f64 * 1000.0 / f64::from(self.fps.max(1));
            let snapshot = timeline.snapshot_at(&doc, t);
            let hotspot = marker
                .map(|id| hotspot_of(&doc, id, &snapshot, key.size))
                .unwrap_or_default();

            if let (Some(targets), Some(mirrored)) = (&flips, mirrored.as_mut()) {
                let flipped = flip_snapshot(&doc, &snapshot, targets, width);
                mirrored.push(Frame {
                    svg: doc.render(&flipped, marker),
                    duration_ms: *duration_ms,
                    hotspot: hotspot.mirrored(key.size),
                });
            }

            frames.push(Frame {
                svg: doc.render(&snapshot, marker),
                duration_ms: *duration_ms,
                hotspot,
            });
        }

        Ok(SampledFrames {
            frames,
            left_handed: mirrored,
        })
    }
}

fn flip_targets(doc: &SvgDocument, selector: &str, sprite: &str) -> ThemeResult<Vec<NodeId>> {
    let parsed = Selector::parse(selector).map_err(|reason| ThemeError::InvalidSelector {
        sprite: sprite.to_string(),
        selector: selector.to_string(),
        reason,
    })?;
    let matched = parsed.select(doc);
    if matched.is_empty() {
        return Err(ThemeError::SelectorMatchedNothing {
            sprite: sprite.to_string(),
            selector: selector.to_string(),
        });
    }
    // Nested matches would flip twice.
    Ok(matched
        .iter()
        .copied()
        .filter(|id| !matched.iter().any(|other| doc.is_ancestor(*other, *id)))
        .collect())
}

/// Mirrors `targets` across the vertical center line of the canvas.
fn flip_snapshot(doc: &SvgDocument, snapshot: &Snapshot, targets: &[NodeId], width: f64) -> Snapshot {
    let mirror = about(Point::new(width / 2.0, 0.0), Affine::scale_non_uniform(-1.0, 1.0));
    let mut flipped = snapshot.clone();
    for id in targets {
        if *id == doc.root() {
            // The root has no parent space; mirror its children instead.
            continue;
        }
        let to_root = doc.parent_to_root(*id, snapshot);
        let effective = doc.effective_transform(*id, snapshot);
        let entry = flipped.entry(*id).or_default();
        entry.transform = Some(to_root.inverse() * mirror * to_root * effective);
    }
    if targets.contains(&doc.root()) {
        let to_root = doc.viewport_transform();
        let children: Vec<NodeId> = doc
            .element_ids()
            .filter(|id| doc.parent(*id) == Some(doc.root()))
            .collect();
        for id in children {
            let effective = doc.effective_transform(id, snapshot);
            let entry = flipped.entry(id).or_default();
            entry.transform = Some(to_root.inverse() * mirror * to_root * effective);
        }
    }
    flipped
}

/// Center of the marker's bounds in intrinsic units, rounded outward.
fn hotspot_of(doc: &SvgDocument, marker: NodeId, snapshot: &Snapshot, size: u32) -> Hotspot {
    let Some(bounds) = doc.root_bounds(marker, snapshot) else {
        return Hotspot::default();
    };
    let center = bounds.center();
    let clamp = |v: f64| v.ceil().clamp(0.0, f64::from(size)) as u32;
    Hotspot::new(clamp(center.x), clamp(center.y))
}
