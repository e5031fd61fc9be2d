//! Knowledge-graph view: force-directed layout and SVG rendering.
//!
//! Nodes are taxpayers drawn as pills sized to their label; links are
//! invoices drawn as curved arrows with animated flow particles. A link's
//! color carries the backend's verdict (red for a mismatch, green for a
//! match) and sets how busy its particles are. Nothing here interprets the
//! graph beyond drawing it.

use std::collections::HashMap;
use std::f64::consts::PI;
use std::fmt::Write;

use tracing::debug;

use crate::model::{GraphData, GstLink};

pub const EMPTY_PLACEHOLDER: &str =
    "No graph data yet. Upload a GSTR CSV to build the knowledge graph.";

const ALPHA_MIN: f64 = 0.001;
/// Upper bound on node-pair force evaluations per layout run. Repulsion is
/// all-pairs, so large graphs get fewer ticks.
const PAIR_BUDGET: usize = 30_000_000;
const MIN_TICKS: usize = 10;
const DEFAULT_NODE_FILL: &str = "#1e293b";
const DEFAULT_LINK_COLOR: &str = "#94a3b8";
/// Particle speeds are per animation frame; SVG wants seconds.
const FRAMES_PER_SECOND: f64 = 60.0;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    fn dist(&self, other: &Point) -> f64 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

// ── Layout ──

/// Velocity-Verlet force simulation in the style of d3-force: many-body
/// repulsion, link springs, and centering, cooled over a fixed number of
/// ticks. Seeded from a phyllotaxis spiral, so output is deterministic.
///
/// Each tick costs O(n²), so the tick count is cut for large graphs (see
/// [`ForceLayout::effective_ticks`]). Past a few thousand nodes the layout
/// runs only the minimum and comes out coarse.
#[derive(Debug, Clone)]
pub struct ForceLayout {
    pub link_distance: f64,
    /// Negative values repel.
    pub charge: f64,
    pub velocity_decay: f64,
    pub ticks: usize,
}

impl Default for ForceLayout {
    fn default() -> Self {
        Self {
            link_distance: 140.0,
            charge: -400.0,
            velocity_decay: 0.4,
            ticks: 300,
        }
    }
}

impl ForceLayout {
    /// Ticks actually run for `n` nodes: `self.ticks`, reduced so the run
    /// stays within the pair budget, but never below a short cooling pass.
    pub fn effective_ticks(&self, n: usize) -> usize {
        let pairs = n.saturating_mul(n).max(1);
        self.ticks.min((PAIR_BUDGET / pairs).max(MIN_TICKS))
    }

    /// Positions for `graph.nodes`, in the same order. Links naming unknown
    /// node ids and self-loops exert no force.
    pub fn run(&self, graph: &GraphData) -> Vec<Point> {
        let n = graph.nodes.len();
        if n == 0 {
            return Vec::new();
        }

        let index = node_index(graph);
        let edges: Vec<(usize, usize)> = graph
            .links
            .iter()
            .filter_map(|l| Some((*index.get(l.source.as_str())?, *index.get(l.target.as_str())?)))
            .filter(|(s, t)| s != t)
            .collect();

        let mut degree = vec![0usize; n];
        for &(s, t) in &edges {
            degree[s] += 1;
            degree[t] += 1;
        }

        let mut pos: Vec<Point> = (0..n).map(phyllotaxis).collect();
        let mut vel = vec![Point::default(); n];
        let ticks = self.effective_ticks(n);
        let mut alpha = 1.0;
        let alpha_decay = 1.0 - ALPHA_MIN.powf(1.0 / ticks.max(1) as f64);
        if ticks < self.ticks {
            debug!(nodes = n, ticks, "shortened layout for large graph");
        }

        for _ in 0..ticks {
            alpha -= alpha * alpha_decay;

            for &(s, t) in &edges {
                let mut dx = pos[t].x + vel[t].x - pos[s].x - vel[s].x;
                let mut dy = pos[t].y + vel[t].y - pos[s].y - vel[s].y;
                if dx == 0.0 && dy == 0.0 {
                    dx = jiggle(s + t);
                    dy = jiggle(s * t + 1);
                }
                let l = (dx * dx + dy * dy).sqrt();
                let strength = 1.0 / degree[s].min(degree[t]) as f64;
                let k = (l - self.link_distance) / l * alpha * strength;
                dx *= k;
                dy *= k;
                let bias = degree[s] as f64 / (degree[s] + degree[t]) as f64;
                vel[t].x -= dx * bias;
                vel[t].y -= dy * bias;
                vel[s].x += dx * (1.0 - bias);
                vel[s].y += dy * (1.0 - bias);
            }

            for i in 0..n {
                for j in 0..n {
                    if i == j {
                        continue;
                    }
                    let mut dx = pos[j].x - pos[i].x;
                    let mut dy = pos[j].y - pos[i].y;
                    if dx == 0.0 && dy == 0.0 {
                        dx = jiggle(i + j);
                        dy = jiggle(i * j + 2);
                    }
                    let l2 = (dx * dx + dy * dy).max(1.0);
                    let w = self.charge * alpha / l2;
                    vel[i].x += dx * w;
                    vel[i].y += dy * w;
                }
            }

            for (p, v) in pos.iter_mut().zip(vel.iter_mut()) {
                v.x *= 1.0 - self.velocity_decay;
                v.y *= 1.0 - self.velocity_decay;
                p.x += v.x;
                p.y += v.y;
            }

            let (sx, sy) = pos
                .iter()
                .fold((0.0, 0.0), |(ax, ay), p| (ax + p.x, ay + p.y));
            let (cx, cy) = (sx / n as f64, sy / n as f64);
            for p in &mut pos {
                p.x -= cx;
                p.y -= cy;
            }
        }
        pos
    }
}

fn node_index(graph: &GraphData) -> HashMap<&str, usize> {
    graph
        .nodes
        .iter()
        .enumerate()
        .map(|(i, n)| (n.id.as_str(), i))
        .collect()
}

fn phyllotaxis(i: usize) -> Point {
    let radius = 10.0 * (0.5 + i as f64).sqrt();
    let angle = i as f64 * PI * (3.0 - 5f64.sqrt());
    Point {
        x: radius * angle.cos(),
        y: radius * angle.sin(),
    }
}

fn jiggle(seed: usize) -> f64 {
    (seed as f64 + 1.0) * 1e-6
}

// ── Paint routines ──

/// Width and height of a node pill for `label`.
pub fn pill_size(label: &str, font_size: f64) -> (f64, f64) {
    let text_width = label.chars().count() as f64 * font_size * 0.6;
    let pad_x = font_size * 0.8;
    let pad_y = font_size * 0.5;
    (text_width + 2.0 * pad_x, font_size + 2.0 * pad_y)
}

/// Verdict carried by a link color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    Mismatch,
    Match,
    Other,
}

impl LinkKind {
    pub fn from_color(color: &str) -> Self {
        match color.trim().to_ascii_lowercase().as_str() {
            "red" | "#f00" | "#ff0000" | "#ef4444" | "#dc2626" => Self::Mismatch,
            "green" | "#0f0" | "#00ff00" | "#22c55e" | "#16a34a" => Self::Match,
            _ => Self::Other,
        }
    }
}

/// Directional particles drawn along a link.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParticleProfile {
    pub count: usize,
    /// Fraction of the link travelled per frame.
    pub speed: f64,
}

impl ParticleProfile {
    /// Seconds for one particle to traverse the link.
    pub fn duration_secs(&self) -> f64 {
        1.0 / (self.speed * FRAMES_PER_SECOND)
    }
}

pub fn particle_profile(color: &str) -> ParticleProfile {
    match LinkKind::from_color(color) {
        LinkKind::Mismatch => ParticleProfile {
            count: 4,
            speed: 0.012,
        },
        LinkKind::Match => ParticleProfile {
            count: 2,
            speed: 0.004,
        },
        LinkKind::Other => ParticleProfile {
            count: 1,
            speed: 0.004,
        },
    }
}

// ── Rendering ──

#[derive(Debug, Clone)]
pub struct RenderOptions {
    pub font_size: f64,
    /// Bend of each link as a fraction of its length.
    pub curvature: f64,
    pub margin: f64,
    pub layout: ForceLayout,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            font_size: 12.0,
            curvature: 0.2,
            margin: 40.0,
            layout: ForceLayout::default(),
        }
    }
}

/// What the graph page shows.
#[derive(Debug, Clone, PartialEq)]
pub enum GraphView {
    /// No nodes: show [`EMPTY_PLACEHOLDER`] instead of a canvas.
    Empty,
    /// Standalone SVG document.
    Canvas(String),
}

impl GraphView {
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

struct Pill {
    center: Point,
    half_w: f64,
    half_h: f64,
}

impl Pill {
    /// Point where the ray from the center toward `toward` leaves the pill's
    /// bounding box.
    fn boundary(&self, toward: Point) -> Point {
        let dx = toward.x - self.center.x;
        let dy = toward.y - self.center.y;
        if dx == 0.0 && dy == 0.0 {
            return self.center;
        }
        let sx = if dx == 0.0 { f64::INFINITY } else { self.half_w / dx.abs() };
        let sy = if dy == 0.0 { f64::INFINITY } else { self.half_h / dy.abs() };
        let s = sx.min(sy).min(1.0);
        Point {
            x: self.center.x + dx * s,
            y: self.center.y + dy * s,
        }
    }
}

pub fn render(graph: &GraphData, opts: &RenderOptions) -> GraphView {
    if graph.is_empty() {
        return GraphView::Empty;
    }

    let positions = opts.layout.run(graph);
    let index = node_index(graph);

    let pills: Vec<Pill> = graph
        .nodes
        .iter()
        .zip(&positions)
        .map(|(node, &center)| {
            let font = node_font(node.size, opts.font_size);
            let (w, h) = pill_size(&node.label, font);
            Pill {
                center,
                half_w: w / 2.0,
                half_h: h / 2.0,
            }
        })
        .collect();

    let (min_x, min_y, max_x, max_y) = pills.iter().fold(
        (f64::MAX, f64::MAX, f64::MIN, f64::MIN),
        |(a, b, c, d), p| {
            (
                a.min(p.center.x - p.half_w),
                b.min(p.center.y - p.half_h),
                c.max(p.center.x + p.half_w),
                d.max(p.center.y + p.half_h),
            )
        },
    );
    let m = opts.margin;
    let (vx, vy) = (min_x - m, min_y - m);
    let (vw, vh) = (max_x - min_x + 2.0 * m, max_y - min_y + 2.0 * m);

    let mut svg = String::new();
    let _ = writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="{vx:.1} {vy:.1} {vw:.1} {vh:.1}" width="{vw:.0}" height="{vh:.0}" font-family="sans-serif">"#
    );

    let mut colors: Vec<&str> = graph.links.iter().map(|l| link_color(l)).collect();
    colors.sort_unstable();
    colors.dedup();
    svg.push_str("<defs>\n");
    for (i, color) in colors.iter().enumerate() {
        let _ = writeln!(
            svg,
            r#"<marker id="arrow-{i}" viewBox="0 0 10 10" refX="9" refY="5" markerWidth="6" markerHeight="6" orient="auto-start-reverse"><path d="M0,0 L10,5 L0,10 z" fill="{}"/></marker>"#,
            escape(color)
        );
    }
    svg.push_str("</defs>\n<g class=\"links\">\n");

    for link in &graph.links {
        let (Some(&s), Some(&t)) = (
            index.get(link.source.as_str()),
            index.get(link.target.as_str()),
        ) else {
            continue;
        };
        let color = link_color(link);
        let marker = colors.iter().position(|c| *c == color).unwrap_or(0);
        let path = if s == t {
            self_loop_path(&pills[s])
        } else {
            curve_path(&pills[s], &pills[t], opts.curvature)
        };

        let _ = writeln!(
            svg,
            r#"<path class="edge" d="{path}" fill="none" stroke="{c}" stroke-width="1.5" marker-end="url(#arrow-{marker})"><title>{label}</title></path>"#,
            c = escape(color),
            label = escape(&link.label),
        );

        let profile = particle_profile(color);
        let dur = profile.duration_secs();
        for k in 0..profile.count {
            let begin = dur * k as f64 / profile.count as f64;
            let _ = writeln!(
                svg,
                r#"<circle class="particle" r="2.5" fill="{c}"><animateMotion dur="{dur:.2}s" begin="-{begin:.2}s" repeatCount="indefinite" path="{path}"/></circle>"#,
                c = escape(color),
            );
        }
    }
    svg.push_str("</g>\n<g class=\"nodes\">\n");

    for (node, pill) in graph.nodes.iter().zip(&pills) {
        let font = node_font(node.size, opts.font_size);
        let fill = node.color.as_deref().unwrap_or(DEFAULT_NODE_FILL);
        let _ = writeln!(
            svg,
            r##"<g class="node"><rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" rx="{r:.1}" fill="{fill}" stroke="#475569"/><text x="{cx:.1}" y="{cy:.1}" font-size="{font:.1}" fill="#f8fafc" text-anchor="middle" dominant-baseline="central">{label}</text></g>"##,
            x = pill.center.x - pill.half_w,
            y = pill.center.y - pill.half_h,
            w = pill.half_w * 2.0,
            h = pill.half_h * 2.0,
            r = pill.half_h,
            fill = escape(fill),
            cx = pill.center.x,
            cy = pill.center.y,
            label = escape(&node.label),
        );
    }
    svg.push_str("</g>\n</svg>\n");

    GraphView::Canvas(svg)
}

fn node_font(size: Option<f64>, base: f64) -> f64 {
    base * size.unwrap_or(1.0).clamp(0.5, 3.0)
}

fn link_color(link: &GstLink) -> &str {
    if link.color.trim().is_empty() {
        DEFAULT_LINK_COLOR
    } else {
        link.color.as_str()
    }
}

fn curve_path(source: &Pill, target: &Pill, curvature: f64) -> String {
    let (a, b) = (source.center, target.center);
    let len = a.dist(&b);
    // Control point offset along the left normal, so A→B and B→A curve apart.
    let (nx, ny) = if len == 0.0 {
        (0.0, 0.0)
    } else {
        (-(b.y - a.y) / len, (b.x - a.x) / len)
    };
    let ctrl = Point {
        x: (a.x + b.x) / 2.0 + nx * len * curvature,
        y: (a.y + b.y) / 2.0 + ny * len * curvature,
    };
    let start = source.boundary(ctrl);
    let end = target.boundary(ctrl);
    format!(
        "M{:.1},{:.1} Q{:.1},{:.1} {:.1},{:.1}",
        start.x, start.y, ctrl.x, ctrl.y, end.x, end.y
    )
}

fn self_loop_path(pill: &Pill) -> String {
    let top = pill.center.y - pill.half_h;
    let x = pill.center.x;
    let spread = pill.half_h * 2.0;
    format!(
        "M{:.1},{:.1} C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
        x - spread / 2.0,
        top,
        x - spread * 1.5,
        top - spread * 2.5,
        x + spread * 1.5,
        top - spread * 2.5,
        x + spread / 2.0,
        top
    )
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}
