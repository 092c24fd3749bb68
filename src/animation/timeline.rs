// Compiled animation timeline: segments of easing-driven steps per target set.

use kurbo::{Affine, Point, Vec2};

use super::description::{Argument, InstructionSpec, SpriteDescription};
use super::document::{ElementOverride, NodeId, Snapshot, SvgDocument};
use super::ease::Ease;
use super::selector::Selector;
use super::transform::about;
use crate::error::{ThemeError, ThemeResult};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Rgb {
    pub r: f64,
    pub g: f64,
    pub b: f64,
}

impl Rgb {
    pub const BLACK: Rgb = Rgb {
        r: 0.0,
        g: 0.0,
        b: 0.0,
    };

    /// Accepts `#rgb` and `#rrggbb`.
    pub fn parse(text: &str) -> Option<Self> {
        let hex = text.trim().strip_prefix('#')?;
        let channel = |s: &str| u8::from_str_radix(s, 16).ok().map(f64::from);
        match hex.len() {
            3 => {
                let mut digits = hex.chars().map(|c| c.to_string().repeat(2));
                Some(Self {
                    r: channel(&digits.next()?)?,
                    g: channel(&digits.next()?)?,
                    b: channel(&digits.next()?)?,
                })
            }
            6 if hex.is_ascii() => Some(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            _ => None,
        }
    }

    fn lerp(self, other: Rgb, p: f64) -> Rgb {
        Rgb {
            r: self.r + (other.r - self.r) * p,
            g: self.g + (other.g - self.g) * p,
            b: self.b + (other.b - self.b) * p,
        }
    }

    pub fn to_hex(self) -> String {
        let byte = |v: f64| v.round().clamp(0.0, 255.0) as u8;
        format!("#{:02x}{:02x}{:02x}", byte(self.r), byte(self.g), byte(self.b))
    }
}

/// One change described inside an `animate` segment, reached in full at the
/// segment's end.
#[derive(Clone, Debug, PartialEq)]
pub enum Step {
    Translate(Vec2),
    Rotate { degrees: f64, origin: Option<Point> },
    Scale { sx: f64, sy: f64, origin: Option<Point> },
    Flip { x: bool, y: bool },
    Opacity(f64),
    Fill(Rgb),
}

impl Step {
    /// Partial transform at progress `p`; `center` is the default origin.
    fn transform_at(&self, p: f64, center: Point) -> Option<Affine> {
        let affine = match self {
            Step::Translate(delta) => Affine::translate(*delta * p),
            Step::Rotate { degrees, origin } => {
                about(origin.unwrap_or(center), Affine::rotate((degrees * p).to_radians()))
            }
            Step::Scale { sx, sy, origin } => about(
                origin.unwrap_or(center),
                Affine::scale_non_uniform(1.0 + (sx - 1.0) * p, 1.0 + (sy - 1.0) * p),
            ),
            Step::Flip { x, y } => {
                let axis = |flip: bool| if flip { 1.0 - 2.0 * p } else { 1.0 };
                about(center, Affine::scale_non_uniform(axis(*x), axis(*y)))
            }
            Step::Opacity(_) | Step::Fill(_) => return None,
        };
        Some(affine)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub start: f64,
    pub duration: f64,
    pub ease: Ease,
    pub steps: Vec<Step>,
}

impl Segment {
    pub fn end(&self) -> f64 {
        self.start + self.duration
    }

    pub fn progress(&self, t: f64) -> f64 {
        if self.duration <= 0.0 {
            return if t >= self.start { 1.0 } else { 0.0 };
        }
        self.ease.apply((t - self.start) / self.duration)
    }
}

/// Segments of one animation entry, shared by every element it selected.
#[derive(Clone, Debug)]
pub struct Track {
    pub targets: Vec<NodeId>,
    pub segments: Vec<Segment>,
}

#[derive(Clone, Debug, Default)]
pub struct Timeline {
    pub tracks: Vec<Track>,
}

impl Timeline {
    pub fn compile(doc: &SvgDocument, description: &SpriteDescription, sprite: &str) -> ThemeResult<Self> {
        let mut tracks = Vec::with_capacity(description.animations.len());
        for animation in &description.animations {
            let selector = Selector::parse(&animation.selector).map_err(|reason| {
                ThemeError::InvalidSelector {
                    sprite: sprite.to_string(),
                    selector: animation.selector.clone(),
                    reason,
                }
            })?;
            let targets = selector.select(doc);
            if targets.is_empty() {
                return Err(ThemeError::SelectorMatchedNothing {
                    sprite: sprite.to_string(),
                    selector: animation.selector.clone(),
                });
            }
            let segments = compile_segments(&animation.instructions, sprite)?;
            tracks.push(Track { targets, segments });
        }
        Ok(Self { tracks })
    }

    /// Latest segment end, in milliseconds.
    pub fn duration(&self) -> f64 {
        self.tracks
            .iter()
            .flat_map(|track| track.segments.iter().map(Segment::end))
            .fold(0.0, f64::max)
    }

    /// Overrides for every animated element at time `t` (ms).
    pub fn snapshot_at(&self, doc: &SvgDocument, t: f64) -> Snapshot {
        let mut snapshot = Snapshot::new();
        let mut targets: Vec<NodeId> = self.tracks.iter().flat_map(|tr| tr.targets.iter().copied()).collect();
        targets.sort();
        targets.dedup();

        for node in targets {
            let Some(element) = doc.element(node) else {
                continue;
            };
            let base = element.base_transform();
            let center = doc.static_bounds(node).map(|b| b.center()).unwrap_or(Point::ZERO);

            let mut segments: Vec<&Segment> = self
                .tracks
                .iter()
                .filter(|track| track.targets.contains(&node))
                .flat_map(|track| track.segments.iter())
                .collect();

            let mut matrix = Affine::IDENTITY;
            let mut has_transform = false;
            for segment in &segments {
                let p = segment.progress(t);
                for step in &segment.steps {
                    if let Some(contribution) = step.transform_at(p, center) {
                        matrix = contribution * matrix;
                        has_transform = true;
                    }
                }
            }

            segments.sort_by(|a, b| a.start.total_cmp(&b.start));
            let mut opacity: Option<f64> = None;
            let mut fill: Option<Rgb> = None;
            for segment in &segments {
                let p = segment.progress(t);
                for step in &segment.steps {
                    match step {
                        Step::Opacity(target) => {
                            let from = opacity.unwrap_or_else(|| base_opacity(element.attribute("opacity")));
                            opacity = Some(from + (target - from) * p);
                        }
                        Step::Fill(target) => {
                            let from = fill
                                .or_else(|| element.attribute("fill").and_then(Rgb::parse))
                                .unwrap_or(if element.attribute("fill").is_some() { *target } else { Rgb::BLACK });
                            fill = Some(from.lerp(*target, p));
                        }
                        _ => {}
                    }
                }
            }

            snapshot.insert(
                node,
                ElementOverride {
                    transform: has_transform.then(|| matrix * base),
                    opacity,
                    fill: fill.map(Rgb::to_hex),
                },
            );
        }
        snapshot
    }
}

fn base_opacity(value: Option<&str>) -> f64 {
    value
        .and_then(|v| v.trim().parse::<f64>().ok())
        .map(|v| v.clamp(0.0, 1.0))
        .unwrap_or(1.0)
}

fn compile_segments(instructions: &[InstructionSpec], sprite: &str) -> ThemeResult<Vec<Segment>> {
    let mut segments: Vec<Segment> = Vec::new();

    for instruction in instructions {
        let name = instruction.name.as_str();
        let invalid = |reason: String| ThemeError::InvalidInstruction {
            sprite: sprite.to_string(),
            name: name.to_string(),
            reason,
        };
        let args = &instruction.arguments;

        if name == "animate" {
            let previous_end = segments.last().map(Segment::end).unwrap_or(0.0);
            segments.push(parse_animate(args, previous_end).map_err(invalid)?);
            continue;
        }

        let step = parse_step(name, args).map_err(|e| match e {
            StepError::Unknown => ThemeError::UnknownInstruction {
                sprite: sprite.to_string(),
                name: name.to_string(),
            },
            StepError::Invalid(reason) => invalid(reason),
        })?;
        let Some(segment) = segments.last_mut() else {
            return Err(invalid("must follow an `animate` instruction".to_string()));
        };
        segment.steps.push(step);
    }

    Ok(segments)
}

fn parse_animate(args: &[Argument], previous_end: f64) -> Result<Segment, String> {
    let duration = args
        .first()
        .and_then(Argument::as_number)
        .filter(|d| *d >= 0.0)
        .ok_or("expects a non-negative duration in milliseconds")?;

    let mut start = previous_end;
    let mut ease = Ease::Linear;
    let mut seen_ease = false;
    for arg in args.iter().skip(1) {
        if let Some(word) = arg.as_word() {
            if seen_ease {
                return Err("more than one timing curve".to_string());
            }
            ease = Ease::from_name(word).ok_or_else(|| format!("unknown timing curve `{}`", word))?;
            seen_ease = true;
        } else if let Some(offset) = arg.as_number().filter(|o| *o >= 0.0) {
            if seen_ease {
                return Err("start offset must come before the timing curve".to_string());
            }
            start = offset;
        } else {
            return Err(format!("invalid argument `{}`", arg));
        }
    }
    if args.len() > 3 {
        return Err(format!("takes at most 3 arguments, got {}", args.len()));
    }

    Ok(Segment {
        start,
        duration,
        ease,
        steps: Vec::new(),
    })
}

enum StepError {
    Unknown,
    Invalid(String),
}

fn parse_step(name: &str, args: &[Argument]) -> Result<Step, StepError> {
    let numbers = || -> Result<Vec<f64>, StepError> {
        args.iter()
            .map(|a| {
                a.as_number()
                    .ok_or_else(|| StepError::Invalid(format!("`{}` is not a number", a)))
            })
            .collect()
    };
    let arity = |n: usize| StepError::Invalid(format!("unexpected argument count {}", n));

    let step = match name {
        "translate" => match numbers()?.as_slice() {
            [dx] => Step::Translate(Vec2::new(*dx, 0.0)),
            [dx, dy] => Step::Translate(Vec2::new(*dx, *dy)),
            other => return Err(arity(other.len())),
        },
        "dx" => match numbers()?.as_slice() {
            [dx] => Step::Translate(Vec2::new(*dx, 0.0)),
            other => return Err(arity(other.len())),
        },
        "dy" => match numbers()?.as_slice() {
            [dy] => Step::Translate(Vec2::new(0.0, *dy)),
            other => return Err(arity(other.len())),
        },
        "rotate" => match numbers()?.as_slice() {
            [degrees] => Step::Rotate {
                degrees: *degrees,
                origin: None,
            },
            [degrees, cx, cy] => Step::Rotate {
                degrees: *degrees,
                origin: Some(Point::new(*cx, *cy)),
            },
            other => return Err(arity(other.len())),
        },
        "scale" => match numbers()?.as_slice() {
            [s] => Step::Scale {
                sx: *s,
                sy: *s,
                origin: None,
            },
            [sx, sy] => Step::Scale {
                sx: *sx,
                sy: *sy,
                origin: None,
            },
            [s, cx, cy] => Step::Scale {
                sx: *s,
                sy: *s,
                origin: Some(Point::new(*cx, *cy)),
            },
            [sx, sy, cx, cy] => Step::Scale {
                sx: *sx,
                sy: *sy,
                origin: Some(Point::new(*cx, *cy)),
            },
            other => return Err(arity(other.len())),
        },
        "flip" => {
            let axis = match args {
                [] => "x",
                [arg] => arg.as_word().unwrap_or_default(),
                _ => return Err(arity(args.len())),
            };
            match axis {
                "x" | "horizontal" => Step::Flip { x: true, y: false },
                "y" | "vertical" => Step::Flip { x: false, y: true },
                "both" | "xy" => Step::Flip { x: true, y: true },
                other => return Err(StepError::Invalid(format!("unknown axis `{}`", other))),
            }
        }
        "opacity" => match numbers()?.as_slice() {
            [v] if (0.0..=1.0).contains(v) => Step::Opacity(*v),
            [v] => return Err(StepError::Invalid(format!("opacity {} is outside 0..=1", v))),
            other => return Err(arity(other.len())),
        },
        "fill" => match args {
            [arg] => {
                let text = arg.to_string();
                Step::Fill(Rgb::parse(&text).ok_or_else(|| StepError::Invalid(format!("`{}` is not a #rrggbb color", text)))?)
            }
            _ => return Err(arity(args.len())),
        },
        _ => return Err(StepError::Unknown),
    };
    Ok(step)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::description::AnimationSpec;

    const SVG: &str = r##"<svg xmlns="http://www.w3.org/2000/svg" width="24" height="24">
        <rect id="dot" x="8" y="8" width="8" height="8" opacity="0.5" fill="#000000"/>
        <rect id="bar" width="2" height="2"/>
    </svg>"##;

    fn description(selector: &str, instructions: Vec<InstructionSpec>) -> SpriteDescription {
        SpriteDescription {
            flips: None,
            animations: vec![AnimationSpec {
                selector: selector.to_string(),
                instructions,
            }],
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn segments_chain_and_honor_offsets() {
        let segments = compile_segments(
            &[
                InstructionSpec::new("animate", &["200"]),
                InstructionSpec::new("dx", &["4"]),
                InstructionSpec::new("animate", &["300", "ease-in"]),
                InstructionSpec::new("rotate", &["90"]),
                InstructionSpec::new("animate", &["100", "1000", "<>"]),
                InstructionSpec::new("opacity", &["0"]),
            ],
            "s",
        )
        .unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[1].start, 200.0);
        assert_eq!(segments[1].ease, Ease::InQuad);
        assert_eq!(segments[2].start, 1000.0);
        assert_eq!(segments[2].end(), 1100.0);
    }

    #[test]
    fn instruction_errors() {
        let err = compile_segments(&[InstructionSpec::new("rotate", &["90"])], "s").unwrap_err();
        assert!(matches!(err, ThemeError::InvalidInstruction { .. }));

        let err = compile_segments(
            &[InstructionSpec::new("animate", &["10"]), InstructionSpec::new("wobble", &[])],
            "s",
        )
        .unwrap_err();
        assert!(matches!(err, ThemeError::UnknownInstruction { ref name, .. } if name == "wobble"));

        let err = compile_segments(&[InstructionSpec::new("animate", &["10", "bouncy"])], "s").unwrap_err();
        assert!(err.to_string().contains("bouncy"));

        let err = compile_segments(
            &[InstructionSpec::new("animate", &["10"]), InstructionSpec::new("fill", &["red"])],
            "s",
        )
        .unwrap_err();
        assert!(matches!(err, ThemeError::InvalidInstruction { .. }));
    }

    #[test]
    fn infinite_durations_are_rejected() {
        let animate = |arguments: Vec<Argument>| InstructionSpec {
            name: "animate".to_string(),
            arguments,
        };

        let err = compile_segments(&[animate(vec![Argument::Number(f64::INFINITY)])], "s").unwrap_err();
        assert!(matches!(err, ThemeError::InvalidInstruction { ref name, .. } if name == "animate"));

        let err = compile_segments(
            &[animate(vec![Argument::Number(100.0), Argument::Number(f64::INFINITY)])],
            "s",
        )
        .unwrap_err();
        assert!(matches!(err, ThemeError::InvalidInstruction { .. }));

        let err = compile_segments(&[InstructionSpec::new("animate", &["inf"])], "s").unwrap_err();
        assert!(matches!(err, ThemeError::InvalidInstruction { .. }));

        let description = SpriteDescription::from_toml(
            r##"
            [[animations]]
            selector = "#dot"
            instructions = [{ name = "animate", arguments = [inf] }]
            "##,
        )
        .unwrap();
        let doc = SvgDocument::parse(SVG).unwrap();
        assert!(Timeline::compile(&doc, &description, "s").is_err());
    }

    #[test]
    fn unmatched_selector_is_fatal() {
        let doc = SvgDocument::parse(SVG).unwrap();
        let desc = description("#dott", vec![InstructionSpec::new("animate", &["10"])]);
        let err = Timeline::compile(&doc, &desc, "default/wait@24").unwrap_err();
        assert!(matches!(err, ThemeError::SelectorMatchedNothing { ref selector, .. } if selector == "#dott"));
    }

    #[test]
    fn rotation_defaults_to_element_center() {
        let doc = SvgDocument::parse(SVG).unwrap();
        let desc = description(
            "#dot",
            vec![InstructionSpec::new("animate", &["1000"]), InstructionSpec::new("rotate", &["180"])],
        );
        let timeline = Timeline::compile(&doc, &desc, "s").unwrap();
        assert_eq!(timeline.duration(), 1000.0);

        let dot = doc.find_by_id("dot").unwrap();
        let end = timeline.snapshot_at(&doc, 1000.0);
        let matrix = end[&dot].transform.unwrap();
        let p = matrix * Point::new(8.0, 8.0);
        assert!(close(p.x, 16.0) && close(p.y, 16.0));

        let start = timeline.snapshot_at(&doc, 0.0);
        let p = start[&dot].transform.unwrap() * Point::new(8.0, 8.0);
        assert!(close(p.x, 8.0) && close(p.y, 8.0));
    }

    #[test]
    fn later_segments_compose_on_the_left() {
        let doc = SvgDocument::parse(SVG).unwrap();
        let desc = description(
            "#bar",
            vec![
                InstructionSpec::new("animate", &["100"]),
                InstructionSpec::new("scale", &["2", "0", "0"]),
                InstructionSpec::new("animate", &["100"]),
                InstructionSpec::new("translate", &["10", "0"]),
            ],
        );
        let timeline = Timeline::compile(&doc, &desc, "s").unwrap();
        let bar = doc.find_by_id("bar").unwrap();

        let mid = timeline.snapshot_at(&doc, 150.0);
        let p = mid[&bar].transform.unwrap() * Point::new(1.0, 1.0);
        assert!(close(p.x, 7.0) && close(p.y, 2.0));
    }

    #[test]
    fn properties_interpolate_from_attributes() {
        let doc = SvgDocument::parse(SVG).unwrap();
        let desc = description(
            "#dot",
            vec![
                InstructionSpec::new("animate", &["100"]),
                InstructionSpec::new("opacity", &["1"]),
                InstructionSpec::new("fill", &["#ffffff"]),
            ],
        );
        let timeline = Timeline::compile(&doc, &desc, "s").unwrap();
        let dot = doc.find_by_id("dot").unwrap();

        let mid = timeline.snapshot_at(&doc, 50.0);
        assert!(close(mid[&dot].opacity.unwrap(), 0.75));
        assert_eq!(mid[&dot].fill.as_deref(), Some("#808080"));
        assert!(mid[&dot].transform.is_none());
    }

    #[test]
    fn parses_colors() {
        assert_eq!(Rgb::parse("#fff").map(Rgb::to_hex).as_deref(), Some("#ffffff"));
        assert_eq!(Rgb::parse("#12ab34").map(Rgb::to_hex).as_deref(), Some("#12ab34"));
        assert!(Rgb::parse("red").is_none());
        assert!(Rgb::parse("#12345").is_none());
    }
}
