//! Rasterize a [`Scene`] into one animation frame.
//!
//! The frame is the playfield (`WIDTH x HEIGHT`) with the report sidebar
//! to its right. Drawing goes through `tiny-skia`; the finished pixmap is
//! converted to a straight-alpha [`RgbaImage`].

use image::{Rgba, RgbaImage};
use tiny_skia::{
    Color, FillRule, LineCap, Paint, Path, PathBuilder, Pixmap, Rect, Stroke, Transform,
};

use crate::scene::{
    GROUND, HEIGHT, HOUSES, MAX_CRACK_LEVEL, Person, Rock, SIDEBAR, Scene, WIDTH,
};

type Rgb = (u8, u8, u8);

const SKY: Rgb = (140, 178, 255);
const HILL: Rgb = (34, 139, 34);
const EARTH: Rgb = (71, 60, 51);
const SIDEBAR_BG: Rgb = (50, 50, 50);
const REPORT_BAR: Rgb = (255, 200, 200);
const ALERT_BANNER: Rgb = (255, 150, 150);
const LIFE_SAVED: Rgb = (220, 255, 210);
const ALERT_RING: Rgb = (255, 255, 0);
const BLACK: Rgb = (0, 0, 0);

const WALL: Rgb = (210, 180, 140);
const ROOF: Rgb = (150, 0, 0);
const DOOR: Rgb = (100, 50, 0);
const WINDOW: Rgb = (173, 216, 230);

/// Rock fill per crack level; also the legend.
pub const CRACK_COLOURS: [Rgb; MAX_CRACK_LEVEL as usize + 1] = [
    (210, 180, 140),
    (160, 82, 45),
    (139, 69, 19),
    (200, 0, 0),
];

/// Reports listed in the sidebar (most recent last).
const SIDEBAR_REPORTS: usize = 8;
const ALERT_RING_RADIUS: f32 = 60.0;
const BADGE_WIDTH: f32 = 280.0;
const BADGE_HEIGHT: f32 = 64.0;

/// Full frame width including the sidebar.
pub const FRAME_WIDTH: u32 = WIDTH + SIDEBAR;

fn paint(colour: Rgb) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(colour.0, colour.1, colour.2, 255);
    paint.anti_alias = true;
    paint
}

fn stroke(width: f32) -> Stroke {
    Stroke {
        width,
        line_cap: LineCap::Round,
        ..Stroke::default()
    }
}

/// Thin drawing layer over a pixmap. Degenerate shapes are skipped.
struct Canvas {
    pixmap: Pixmap,
}

impl Canvas {
    fn rect(&mut self, x: f32, y: f32, w: f32, h: f32, colour: Rgb) {
        if let Some(rect) = Rect::from_xywh(x, y, w, h) {
            self.pixmap
                .fill_rect(rect, &paint(colour), Transform::identity(), None);
        }
    }

    fn fill(&mut self, path: Option<Path>, colour: Rgb) {
        if let Some(path) = path {
            self.pixmap.fill_path(
                &path,
                &paint(colour),
                FillRule::Winding,
                Transform::identity(),
                None,
            );
        }
    }

    fn outline(&mut self, path: Option<Path>, colour: Rgb, width: f32) {
        if let Some(path) = path {
            self.pixmap.stroke_path(
                &path,
                &paint(colour),
                &stroke(width),
                Transform::identity(),
                None,
            );
        }
    }

    fn line(&mut self, from: (f32, f32), to: (f32, f32), colour: Rgb, width: f32) {
        let mut pb = PathBuilder::new();
        pb.move_to(from.0, from.1);
        pb.line_to(to.0, to.1);
        self.outline(pb.finish(), colour, width);
    }

    fn polygon(&mut self, points: &[(f32, f32)], colour: Rgb) {
        let mut pb = PathBuilder::new();
        if let Some(&(x, y)) = points.first() {
            pb.move_to(x, y);
            for &(x, y) in &points[1..] {
                pb.line_to(x, y);
            }
            pb.close();
        }
        self.fill(pb.finish(), colour);
    }

    fn rounded_rect(&mut self, x: f32, y: f32, w: f32, h: f32, radius: f32, colour: Rgb) {
        let r = radius.min(w / 2.0).min(h / 2.0);
        let mut pb = PathBuilder::new();
        pb.move_to(x + r, y);
        pb.line_to(x + w - r, y);
        pb.quad_to(x + w, y, x + w, y + r);
        pb.line_to(x + w, y + h - r);
        pb.quad_to(x + w, y + h, x + w - r, y + h);
        pb.line_to(x + r, y + h);
        pb.quad_to(x, y + h, x, y + h - r);
        pb.line_to(x, y + r);
        pb.quad_to(x, y, x + r, y);
        pb.close();
        self.fill(pb.finish(), colour);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn draw_backdrop(canvas: &mut Canvas) {
    let width = WIDTH as f32;
    let ground = GROUND as f32;
    canvas.fill(
        Rect::from_xywh(0.0, ground - 50.0, width, 200.0).and_then(PathBuilder::from_oval),
        HILL,
    );
    canvas.rect(0.0, ground, width, HEIGHT as f32 - ground, EARTH);

    for (i, &colour) in CRACK_COLOURS.iter().enumerate() {
        let y = 40.0f32.mul_add(i as f32, 60.0);
        canvas.rect(10.0, y, 30.0, 30.0, colour);
    }
}

#[allow(clippy::cast_possible_truncation)]
fn draw_houses(canvas: &mut Canvas) {
    for &(hx, hy) in &HOUSES {
        let (x, y) = (hx as f32, hy as f32);
        canvas.rect(x, y + 30.0, 100.0, 70.0, WALL);
        canvas.polygon(
            &[(x - 10.0, y + 30.0), (x + 50.0, y - 10.0), (x + 110.0, y + 30.0)],
            ROOF,
        );
        canvas.rect(x + 40.0, y + 60.0, 20.0, 40.0, DOOR);
        canvas.rect(x + 10.0, y + 45.0, 20.0, 20.0, WINDOW);
        canvas.rect(x + 70.0, y + 45.0, 20.0, 20.0, WINDOW);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn draw_rock(canvas: &mut Canvas, rock: &Rock) {
    let x = (rock.x + rock.shake_offset) as f32;
    let y = rock.y as f32;
    let size = rock.size as f32;
    if size <= 0.0 {
        return;
    }
    let colour = CRACK_COLOURS[usize::from(rock.crack_level.min(MAX_CRACK_LEVEL))];
    let body = Rect::from_xywh(x, y, size, size);
    canvas.fill(body.map(PathBuilder::from_rect), colour);
    canvas.outline(body.map(PathBuilder::from_rect), BLACK, 2.0);

    for crack in &rock.cracks {
        canvas.line(
            (crack[0].mul_add(size, x), crack[1].mul_add(size, y)),
            (crack[2].mul_add(size, x), crack[3].mul_add(size, y)),
            BLACK,
            1.5,
        );
    }

    if rock.is_alerting() {
        let half = size / 2.0;
        canvas.outline(
            PathBuilder::from_circle(x + half, y + half, ALERT_RING_RADIUS),
            ALERT_RING,
            3.0,
        );
    }
}

#[allow(clippy::cast_possible_truncation)]
fn draw_person(canvas: &mut Canvas, person: &Person) {
    if person.escaped {
        return;
    }
    let (x, y) = (person.x as f32, person.y as f32);
    canvas.fill(PathBuilder::from_circle(x, y, 5.0), BLACK);
    canvas.line((x, y + 5.0), (x, y + 20.0), BLACK, 2.0);
    canvas.line((x - 6.0, y + 10.0), (x + 6.0, y + 10.0), BLACK, 2.0);
    canvas.line((x, y + 20.0), (x - 5.0, y + 30.0), BLACK, 2.0);
    canvas.line((x, y + 20.0), (x + 5.0, y + 30.0), BLACK, 2.0);
}

#[allow(clippy::cast_precision_loss)]
fn draw_sidebar(canvas: &mut Canvas, reports: usize) {
    let left = WIDTH as f32;
    canvas.rect(left, 0.0, SIDEBAR as f32, HEIGHT as f32, SIDEBAR_BG);
    let shown = reports.min(SIDEBAR_REPORTS);
    for i in 0..shown {
        let y = 60.0f32.mul_add(i as f32, 50.0);
        canvas.rounded_rect(left + 10.0, y, SIDEBAR as f32 - 20.0, 50.0, 8.0, REPORT_BAR);
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
fn draw_overlays(canvas: &mut Canvas, scene: &Scene) {
    let centre_x = WIDTH as f32 / 2.0;
    if scene.alert_active() {
        canvas.rounded_rect(centre_x - 200.0, 10.0, 400.0, 50.0, 10.0, ALERT_BANNER);
    }
    if let Some(scale) = scene.life_saved_scale() {
        let scale = scale as f32;
        let (w, h) = (BADGE_WIDTH * scale, BADGE_HEIGHT * scale);
        canvas.rounded_rect(
            centre_x - w / 2.0,
            HEIGHT as f32 / 2.0 - h / 2.0,
            w,
            h,
            12.0 * scale,
            LIFE_SAVED,
        );
    }
}

/// Convert a premultiplied pixmap to straight RGBA.
#[allow(clippy::cast_possible_truncation)]
fn pixmap_to_image(pixmap: &Pixmap) -> RgbaImage {
    let data = pixmap.data();
    let mut img = RgbaImage::new(pixmap.width(), pixmap.height());
    for (i, pixel) in img.pixels_mut().enumerate() {
        let off = i * 4;
        let a = data[off + 3];
        *pixel = if a == 0 {
            Rgba([0, 0, 0, 0])
        } else {
            let straight = |c: u8| (u16::from(c) * 255 / u16::from(a)) as u8;
            Rgba([straight(data[off]), straight(data[off + 1]), straight(data[off + 2]), a])
        };
    }
    img
}

/// Draw the current state of `scene`.
#[must_use]
pub fn render_frame(scene: &Scene) -> RgbaImage {
    let Some(pixmap) = Pixmap::new(FRAME_WIDTH, HEIGHT) else {
        return RgbaImage::from_pixel(FRAME_WIDTH, HEIGHT, Rgba([0, 0, 0, 0]));
    };
    let mut canvas = Canvas { pixmap };
    canvas
        .pixmap
        .fill(Color::from_rgba8(SKY.0, SKY.1, SKY.2, 255));

    draw_backdrop(&mut canvas);
    draw_houses(&mut canvas);
    for rock in scene.rocks() {
        draw_rock(&mut canvas, rock);
    }
    for person in scene.people() {
        draw_person(&mut canvas, person);
    }
    draw_sidebar(&mut canvas, scene.reports().len());
    draw_overlays(&mut canvas, scene);

    pixmap_to_image(&canvas.pixmap)
}
