//! 2D structure depiction.
//!
//! The molecule is first turned into a [`Scene`] of line segments and
//! labels in canvas pixels, which is then drawn onto any plotters backend.

use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

use super::error::RenderError;
use super::layout::Layout2D;
use super::{encode_png, ensure_font, RasterImage, VectorImage, FONT_FAMILY};
use crate::atom::Atom;
use crate::bond::BondOrder;
use crate::element::Element;
use crate::sanitize::MoleculeGraph;

const BOND_COLOR: RGBColor = RGBColor(0x20, 0x20, 0x20);
const STROKE: u32 = 2;
const DASH: f64 = 4.0;
const DASH_GAP: f64 = 3.0;

type Px = (f64, f64);

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Segment {
    pub from: Px,
    pub to: Px,
    pub dashed: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Label {
    pub text: String,
    pub at: Px,
    pub color: RGBColor,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub(crate) struct Scene {
    pub segments: Vec<Segment>,
    pub labels: Vec<Label>,
}

pub(crate) fn element_color(atomic_num: u8) -> RGBColor {
    match atomic_num {
        1 => RGBColor(0x80, 0x80, 0x80),
        6 => RGBColor(0x20, 0x20, 0x20),
        7 => RGBColor(0x30, 0x50, 0xF8),
        8 => RGBColor(0xE0, 0x0D, 0x0D),
        9 | 17 => RGBColor(0x1F, 0xA0, 0x1F),
        15 => RGBColor(0xFF, 0x80, 0x00),
        16 => RGBColor(0xC8, 0xA0, 0x00),
        35 => RGBColor(0xA6, 0x29, 0x29),
        53 => RGBColor(0x94, 0x00, 0x94),
        _ => RGBColor(0x60, 0x60, 0x80),
    }
}

fn charge_text(charge: i8) -> String {
    match charge {
        0 => String::new(),
        1 => "+".to_owned(),
        -1 => "-".to_owned(),
        c if c > 0 => format!("{c}+"),
        c => format!("{}-", -c),
    }
}

/// Text drawn for an atom, or `None` for a plain skeletal carbon.
pub(crate) fn atom_label(atom: &Atom, degree: usize) -> Option<String> {
    let plain_carbon = atom.atomic_num == 6 && atom.formal_charge == 0 && atom.isotope == 0 && degree > 0;
    if plain_carbon {
        return None;
    }
    let symbol = Element::from_atomic_num(atom.atomic_num).map_or("?", |e| e.symbol());
    let mut text = String::new();
    if atom.isotope > 0 {
        text.push_str(&atom.isotope.to_string());
    }
    text.push_str(symbol);
    match atom.hydrogen_count {
        0 => {}
        1 => text.push('H'),
        n => text.push_str(&format!("H{n}")),
    }
    text.push_str(&charge_text(atom.formal_charge));
    Some(text)
}

fn offset(p: Px, d: Px, k: f64) -> Px {
    (p.0 + d.0 * k, p.1 + d.1 * k)
}

fn lerp(a: Px, b: Px, t: f64) -> Px {
    (a.0 + (b.0 - a.0) * t, a.1 + (b.1 - a.1) * t)
}

/// Build the scene for a `width` x `height` canvas.
pub(crate) fn scene(graph: &MoleculeGraph, width: u32, height: u32) -> Scene {
    let mol = graph.mol();
    let (w, h) = (f64::from(width), f64::from(height));
    let short = w.min(h);
    let layout = Layout2D::compute(graph);
    let px = layout.fit(w, h, short * 0.08, short * 0.12);

    let bond_px = mol
        .bonds()
        .filter_map(|e| mol.bond_endpoints(e))
        .map(|(a, b)| {
            let (p, q) = (px[a.index()], px[b.index()]);
            (q.0 - p.0).hypot(q.1 - p.1)
        })
        .next()
        .unwrap_or(short * 0.12);
    let font = (bond_px * 0.45).clamp(10.0, 24.0);

    let labels: Vec<Option<String>> = mol
        .atoms()
        .map(|a| atom_label(mol.atom(a), mol.degree(a)))
        .collect();

    let mut out = Scene::default();
    for (a, text) in mol.atoms().zip(&labels) {
        if let Some(text) = text {
            out.labels.push(Label {
                text: text.clone(),
                at: px[a.index()],
                color: element_color(mol.atom(a).atomic_num),
                size: font as u32,
            });
        }
    }

    let gap = bond_px * 0.18;
    for e in mol.bonds() {
        let Some((a, b)) = mol.bond_endpoints(e) else {
            continue;
        };
        let (pa, pb) = (px[a.index()], px[b.index()]);
        let len = (pb.0 - pa.0).hypot(pb.1 - pa.1);
        if len < 1e-6 {
            continue;
        }
        let dir = ((pb.0 - pa.0) / len, (pb.1 - pa.1) / len);
        let normal = (-dir.1, dir.0);

        // Pull the ends back from labelled atoms.
        let trim = font * 0.7;
        let start = if labels[a.index()].is_some() { offset(pa, dir, trim) } else { pa };
        let end = if labels[b.index()].is_some() { offset(pb, dir, -trim) } else { pb };

        // Side of the bond facing the smallest ring through it.
        let inner = graph.rings().smallest_ring_with_bond(a, b).map(|ring| {
            let n = ring.len() as f64;
            let c = ring.iter().fold((0.0, 0.0), |acc, r| {
                let p = px[r.index()];
                (acc.0 + p.0 / n, acc.1 + p.1 / n)
            });
            let mid = lerp(pa, pb, 0.5);
            if (c.0 - mid.0) * normal.0 + (c.1 - mid.1) * normal.1 >= 0.0 {
                1.0
            } else {
                -1.0
            }
        });

        let bond = mol.bond(e);
        let solid = |from, to| Segment { from, to, dashed: false };
        let inner_line = |side: f64, dashed: bool| {
            let s = offset(lerp(start, end, 0.12), normal, side * gap);
            let t = offset(lerp(start, end, 0.88), normal, side * gap);
            Segment { from: s, to: t, dashed }
        };

        if bond.is_aromatic {
            out.segments.push(solid(start, end));
            if let Some(side) = inner {
                out.segments.push(inner_line(side, true));
            }
            continue;
        }
        match (bond.order, inner) {
            (BondOrder::Single, _) => out.segments.push(solid(start, end)),
            (BondOrder::Double, Some(side)) => {
                out.segments.push(solid(start, end));
                out.segments.push(inner_line(side, false));
            }
            (BondOrder::Double, None) => {
                let k = gap / 2.0;
                out.segments.push(solid(offset(start, normal, k), offset(end, normal, k)));
                out.segments.push(solid(offset(start, normal, -k), offset(end, normal, -k)));
            }
            (BondOrder::Triple, _) => {
                out.segments.push(solid(start, end));
                out.segments.push(solid(offset(start, normal, gap), offset(end, normal, gap)));
                out.segments.push(solid(offset(start, normal, -gap), offset(end, normal, -gap)));
            }
        }
    }
    out
}

fn to_px(p: Px) -> (i32, i32) {
    (p.0.round() as i32, p.1.round() as i32)
}

fn dashes(segment: &Segment) -> Vec<[Px; 2]> {
    let (a, b) = (segment.from, segment.to);
    if !segment.dashed {
        return vec![[a, b]];
    }
    let len = (b.0 - a.0).hypot(b.1 - a.1);
    let mut out = Vec::new();
    let mut s = 0.0;
    while s < len {
        let e = (s + DASH).min(len);
        out.push([lerp(a, b, s / len), lerp(a, b, e / len)]);
        s += DASH + DASH_GAP;
    }
    out
}

pub(crate) fn draw_scene<DB: DrawingBackend>(
    root: &DrawingArea<DB, plotters::coord::Shift>,
    scene: &Scene,
) -> Result<(), RenderError> {
    ensure_font()?;
    root.fill(&WHITE).map_err(RenderError::backend)?;
    for segment in &scene.segments {
        for [a, b] in dashes(segment) {
            root.draw(&PathElement::new(vec![to_px(a), to_px(b)], BOND_COLOR.stroke_width(STROKE)))
                .map_err(RenderError::backend)?;
        }
    }
    for label in &scene.labels {
        let style = (FONT_FAMILY, label.size)
            .into_font()
            .color(&label.color)
            .pos(Pos::new(HPos::Center, VPos::Center));
        root.draw(&Text::new(label.text.clone(), to_px(label.at), style))
            .map_err(RenderError::backend)?;
    }
    root.present().map_err(RenderError::backend)
}

fn check_canvas(width: u32, height: u32) -> Result<(), RenderError> {
    if width == 0 || height == 0 {
        return Err(RenderError::InvalidCanvas { width, height });
    }
    Ok(())
}

/// Square SVG depiction, `size` pixels on a side.
pub fn render_2d(graph: &MoleculeGraph, size: u32) -> Result<VectorImage, RenderError> {
    check_canvas(size, size)?;
    let scene = scene(graph, size, size);
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (size, size)).into_drawing_area();
        draw_scene(&root, &scene)?;
    }
    Ok(VectorImage::new(svg))
}

/// The same depiction as [`render_2d`], rasterized to PNG.
pub fn render_2d_png(graph: &MoleculeGraph, size: u32) -> Result<RasterImage, RenderError> {
    check_canvas(size, size)?;
    let scene = scene(graph, size, size);
    let mut pixels = vec![255u8; size as usize * size as usize * 3];
    {
        let root = BitMapBackend::with_buffer(&mut pixels, (size, size)).into_drawing_area();
        draw_scene(&root, &scene)?;
    }
    encode_png(pixels, size, size)
}
