// Immutable SVG arena. Animation never mutates it: each sample is a set of
// per-element overrides that `render` bakes into a fresh serialization.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use kurbo::{Affine, BezPath, Point, Rect, Shape};

use super::transform::{format_matrix, format_number, parse_length, parse_numbers, parse_transform};

const SVG_NS: &str = "http://www.w3.org/2000/svg";
const XLINK_NS: &str = "http://www.w3.org/1999/xlink";
const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

// Elements that never contribute to the painted bounds of their parent.
const NON_RENDERING: &[&str] = &[
    "clipPath",
    "defs",
    "desc",
    "filter",
    "linearGradient",
    "marker",
    "mask",
    "metadata",
    "pattern",
    "radialGradient",
    "style",
    "symbol",
    "title",
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(usize);

#[derive(Clone, Debug)]
pub struct Element {
    pub name: String,
    /// Attributes in source order; namespaced ones carry their `xlink:`/`xml:` prefix.
    pub attributes: Vec<(String, String)>,
    transform: Affine,
}

impl Element {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    pub fn length(&self, name: &str) -> Option<f64> {
        self.attribute(name).and_then(parse_length)
    }

    /// The element's own `transform` attribute.
    pub fn base_transform(&self) -> Affine {
        self.transform
    }
}

#[derive(Clone, Debug)]
enum NodeData {
    Element(Element),
    Text(String),
}

#[derive(Clone, Debug)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Values a sample replaces on one element.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementOverride {
    /// Full effective transform, already composed with the base transform.
    pub transform: Option<Affine>,
    pub opacity: Option<f64>,
    pub fill: Option<String>,
}

pub type Snapshot = BTreeMap<NodeId, ElementOverride>;

#[derive(Clone, Debug)]
pub struct SvgDocument {
    /// Pre-order; index 0 is the root `<svg>`.
    nodes: Vec<Node>,
}

impl SvgDocument {
    pub fn parse(text: &str) -> Result<Self, String> {
        let xml = roxmltree::Document::parse(text).map_err(|e| e.to_string())?;
        let root = xml.root_element();
        if root.tag_name().name() != "svg" {
            return Err(format!("root element is <{}>, not <svg>", root.tag_name().name()));
        }

        let mut doc = Self { nodes: Vec::new() };
        doc.push_element(root, None)?;
        Ok(doc)
    }

    fn push_element(&mut self, node: roxmltree::Node<'_, '_>, parent: Option<NodeId>) -> Result<NodeId, String> {
        let mut attributes = Vec::new();
        for attr in node.attributes() {
            let name = match attr.namespace() {
                None => attr.name().to_string(),
                Some(XLINK_NS) => format!("xlink:{}", attr.name()),
                Some(XML_NS) => format!("xml:{}", attr.name()),
                Some(_) => continue,
            };
            attributes.push((name, attr.value().to_string()));
        }

        let transform = match attributes.iter().find(|(k, _)| k == "transform") {
            Some((_, value)) => parse_transform(value)?,
            None => Affine::IDENTITY,
        };

        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            data: NodeData::Element(Element {
                name: node.tag_name().name().to_string(),
                attributes,
                transform,
            }),
            parent,
            children: Vec::new(),
        });

        for child in node.children() {
            let child_id = if child.is_element() {
                if !matches!(child.tag_name().namespace(), None | Some(SVG_NS)) {
                    continue;
                }
                self.push_element(child, Some(id))?
            } else if child.is_text() {
                let text = child.text().unwrap_or_default();
                if text.trim().is_empty() {
                    continue;
                }
                let text_id = NodeId(self.nodes.len());
                self.nodes.push(Node {
                    data: NodeData::Text(text.to_string()),
                    parent: Some(id),
                    children: Vec::new(),
                });
                text_id
            } else {
                continue;
            };
            self.nodes[id.0].children.push(child_id);
        }

        Ok(id)
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes.get(id.0)?.data {
            NodeData::Element(element) => Some(element),
            NodeData::Text(_) => None,
        }
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.0).and_then(|node| node.parent)
    }

    pub fn element_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        (0..self.nodes.len())
            .map(NodeId)
            .filter(|id| self.element(*id).is_some())
    }

    pub fn find_by_id(&self, value: &str) -> Option<NodeId> {
        self.element_ids()
            .find(|id| self.element(*id).and_then(|e| e.attribute("id")) == Some(value))
    }

    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.parent(id);
        }
        false
    }

    /// `width`/`height` of the root, falling back to the view box extent.
    pub fn intrinsic_size(&self) -> Option<(f64, f64)> {
        let root = self.element(self.root())?;
        let view_box = self.view_box();
        let width = root.length("width").or(view_box.map(|vb| vb.width()))?;
        let height = root.length("height").or(view_box.map(|vb| vb.height()))?;
        Some((width, height))
    }

    fn view_box(&self) -> Option<Rect> {
        let text = self.element(self.root())?.attribute("viewBox")?;
        match parse_numbers(text).ok()?.as_slice() {
            [x, y, w, h] if *w > 0.0 && *h > 0.0 => Some(Rect::new(*x, *y, x + w, y + h)),
            _ => None,
        }
    }

    /// Maps user space of the root's children into intrinsic units.
    pub fn viewport_transform(&self) -> Affine {
        let (Some(view_box), Some((width, height))) = (self.view_box(), self.intrinsic_size()) else {
            return Affine::IDENTITY;
        };
        Affine::scale_non_uniform(width / view_box.width(), height / view_box.height())
            * Affine::translate((-view_box.x0, -view_box.y0))
    }

    pub fn effective_transform(&self, id: NodeId, snapshot: &Snapshot) -> Affine {
        snapshot
            .get(&id)
            .and_then(|o| o.transform)
            .or_else(|| self.element(id).map(Element::base_transform))
            .unwrap_or(Affine::IDENTITY)
    }

    /// Maps the coordinate space `id` is positioned in (its parent's user
    /// space) into intrinsic units of the root.
    pub fn parent_to_root(&self, id: NodeId, snapshot: &Snapshot) -> Affine {
        let mut matrix = Affine::IDENTITY;
        let mut current = self.parent(id);
        while let Some(ancestor) = current {
            if ancestor == self.root() {
                break;
            }
            matrix = self.effective_transform(ancestor, snapshot) * matrix;
            current = self.parent(ancestor);
        }
        self.viewport_transform() * matrix
    }

    /// Bounds in the element's own user space, before its transform.
    pub fn local_bounds(&self, id: NodeId, snapshot: &Snapshot) -> Option<Rect> {
        let element = self.element(id)?;
        let len = |name: &str| element.length(name);
        let num = |name: &str| len(name).unwrap_or(0.0);

        match element.name.as_str() {
            "rect" | "image" | "use" | "foreignObject" => {
                let (x, y) = (num("x"), num("y"));
                Some(Rect::new(x, y, x + len("width")?, y + len("height")?))
            }
            "circle" => {
                let r = len("r")?;
                let (cx, cy) = (num("cx"), num("cy"));
                Some(Rect::new(cx - r, cy - r, cx + r, cy + r))
            }
            "ellipse" => {
                let (rx, ry) = (len("rx")?, len("ry")?);
                let (cx, cy) = (num("cx"), num("cy"));
                Some(Rect::new(cx - rx, cy - ry, cx + rx, cy + ry))
            }
            "line" => Some(Rect::from_points(
                Point::new(num("x1"), num("y1")),
                Point::new(num("x2"), num("y2")),
            )),
            "polyline" | "polygon" => {
                let numbers = parse_numbers(element.attribute("points")?).ok()?;
                numbers
                    .chunks_exact(2)
                    .map(|pair| Rect::from_points(Point::new(pair[0], pair[1]), Point::new(pair[0], pair[1])))
                    .reduce(|a, b| a.union(b))
            }
            "path" => {
                let path = BezPath::from_svg(element.attribute("d")?).ok()?;
                if path.elements().is_empty() {
                    return None;
                }
                Some(path.bounding_box())
            }
            "g" | "a" | "svg" | "switch" => self.nodes[id.0]
                .children
                .iter()
                .filter(|child| {
                    self.element(**child)
                        .is_some_and(|e| !NON_RENDERING.contains(&e.name.as_str()))
                })
                .filter_map(|child| {
                    let bounds = self.local_bounds(*child, snapshot)?;
                    Some(self.effective_transform(*child, snapshot).transform_rect_bbox(bounds))
                })
                .reduce(|a, b| a.union(b)),
            _ => None,
        }
    }

    /// Bounds in the parent's user space using the source transform only.
    pub fn static_bounds(&self, id: NodeId) -> Option<Rect> {
        let empty = Snapshot::new();
        let bounds = self.local_bounds(id, &empty)?;
        Some(self.effective_transform(id, &empty).transform_rect_bbox(bounds))
    }

    /// Bounds in intrinsic units of the root, as seen in `snapshot`.
    pub fn root_bounds(&self, id: NodeId, snapshot: &Snapshot) -> Option<Rect> {
        let bounds = self.local_bounds(id, snapshot)?;
        let matrix = self.parent_to_root(id, snapshot) * self.effective_transform(id, snapshot);
        Some(matrix.transform_rect_bbox(bounds))
    }

    /// Serializes the document with `snapshot` applied, leaving out `skip`
    /// and everything below it.
    pub fn render(&self, snapshot: &Snapshot, skip: Option<NodeId>) -> String {
        let mut out = String::new();
        self.write_node(&mut out, self.root(), snapshot, skip);
        out
    }

    fn write_node(&self, out: &mut String, id: NodeId, snapshot: &Snapshot, skip: Option<NodeId>) {
        if Some(id) == skip {
            return;
        }
        let node = &self.nodes[id.0];
        let element = match &node.data {
            NodeData::Text(text) => {
                out.push_str(&escape(text, false));
                return;
            }
            NodeData::Element(element) => element,
        };
        let over = snapshot.get(&id);

        let _ = write!(out, "<{}", element.name);
        if id == self.root() {
            let _ = write!(out, " xmlns=\"{}\" xmlns:xlink=\"{}\"", SVG_NS, XLINK_NS);
        }
        for (key, value) in &element.attributes {
            let replaced = over.is_some_and(|o| match key.as_str() {
                "transform" => o.transform.is_some(),
                "opacity" => o.opacity.is_some(),
                "fill" => o.fill.is_some(),
                _ => false,
            });
            if replaced {
                continue;
            }
            if key == "style" {
                if let Some(o) = over {
                    let style = strip_style(value, o.fill.is_some(), o.opacity.is_some());
                    if !style.is_empty() {
                        let _ = write!(out, " style=\"{}\"", escape(&style, true));
                    }
                    continue;
                }
            }
            let _ = write!(out, " {}=\"{}\"", key, escape(value, true));
        }
        if let Some(o) = over {
            if let Some(transform) = o.transform {
                let _ = write!(out, " transform=\"{}\"", format_matrix(transform));
            }
            if let Some(opacity) = o.opacity {
                let _ = write!(out, " opacity=\"{}\"", format_number(opacity));
            }
            if let Some(fill) = &o.fill {
                let _ = write!(out, " fill=\"{}\"", escape(fill, true));
            }
        }

        if node.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &node.children {
            self.write_node(out, *child, snapshot, skip);
        }
        let _ = write!(out, "</{}>", element.name);
    }
}

// Drops inline declarations that would shadow an overridden presentation attribute.
fn strip_style(style: &str, fill: bool, opacity: bool) -> String {
    style
        .split(';')
        .map(str::trim)
        .filter(|decl| !decl.is_empty())
        .filter(|decl| {
            let property = decl.split(':').next().unwrap_or_default().trim();
            !(fill && property == "fill" || opacity && property == "opacity")
        })
        .collect::<Vec<_>>()
        .join(";")
}

fn escape(text: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const SVG: &str = r##"<?xml version="1.0"?>
<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink"
     xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape"
     width="24" height="24" viewBox="0 0 48 48">
  <inkscape:grid spacing="2"/>
  <style>.a { fill: red; }</style>
  <g id="arrow" transform="translate(4 4)" inkscape:label="arrow">
    <path id="tip" d="M0 0 L8 0 L8 8 Z" style="fill:#fff;stroke:#000"/>
    <rect id="hotspot" x="2" y="2" width="2" height="2"/>
  </g>
  <use xlink:href="#tip" x="20" y="20" width="8" height="8"/>
</svg>"##;

    fn node(doc: &SvgDocument, id: &str) -> NodeId {
        doc.find_by_id(id).unwrap()
    }

    #[test]
    fn parses_sizes_and_viewbox() {
        let doc = SvgDocument::parse(SVG).unwrap();
        assert_eq!(doc.intrinsic_size(), Some((24.0, 24.0)));
        let p = doc.viewport_transform() * Point::new(48.0, 48.0);
        assert!((p.x - 24.0).abs() < 1e-9 && (p.y - 24.0).abs() < 1e-9);
    }

    #[test]
    fn drops_foreign_elements_and_attributes() {
        let doc = SvgDocument::parse(SVG).unwrap();
        let out = doc.render(&Snapshot::new(), None);
        assert!(!out.contains("inkscape"));
        assert!(out.contains("xlink:href=\"#tip\""));
        assert!(out.contains("<style>.a { fill: red; }</style>"));
        assert!(out.starts_with("<svg xmlns=\"http://www.w3.org/2000/svg\""));
        SvgDocument::parse(&out).unwrap();
    }

    #[test]
    fn bounds_follow_transforms() {
        let doc = SvgDocument::parse(SVG).unwrap();
        let hotspot = node(&doc, "hotspot");
        let bounds = doc.root_bounds(hotspot, &Snapshot::new()).unwrap();
        // (2..4 + 4) in a 48 unit view box rendered at 24
        assert_eq!(bounds, Rect::new(3.0, 3.0, 4.0, 4.0));

        let arrow = node(&doc, "arrow");
        assert_eq!(doc.static_bounds(arrow), Some(Rect::new(4.0, 4.0, 12.0, 12.0)));
    }

    #[test]
    fn render_applies_overrides_and_skips() {
        let doc = SvgDocument::parse(SVG).unwrap();
        let tip = node(&doc, "tip");
        let arrow = node(&doc, "arrow");
        let mut snapshot = Snapshot::new();
        snapshot.insert(arrow, ElementOverride {
            transform: Some(Affine::translate((1.0, 2.0))),
            ..Default::default()
        });
        snapshot.insert(tip, ElementOverride {
            fill: Some("#ff0000".into()),
            opacity: Some(0.5),
            ..Default::default()
        });

        let out = doc.render(&snapshot, Some(node(&doc, "hotspot")));
        assert!(out.contains("transform=\"matrix(1 0 0 1 1 2)\""));
        assert!(!out.contains("translate(4 4)"));
        assert!(out.contains("style=\"stroke:#000\""));
        assert!(out.contains("fill=\"#ff0000\""));
        assert!(out.contains("opacity=\"0.5\""));
        assert!(!out.contains("id=\"hotspot\""));
    }

    #[test]
    fn rejects_bad_input() {
        assert!(SvgDocument::parse("<html/>").is_err());
        assert!(SvgDocument::parse("<svg xmlns=\"http://www.w3.org/2000/svg\"><g transform=\"spin(3)\"/></svg>").is_err());
        assert!(SvgDocument::parse("not xml").is_err());
    }
}
