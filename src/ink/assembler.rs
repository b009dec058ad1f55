//! Turns the ordered real-time sample stream into strokes.

use log::debug;

use super::mapper::{DEFAULT_MAX_PRESSURE, fit_scale, normalize_pressure};
use super::sample::{HoverPhase, RawSample, SamplePhase};
use super::stroke::{Point, StrokeChange, StrokeCollection};

/// Counts page and layer boundaries seen since the assembler was created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct PageContext(u64);

impl PageContext {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Hover position changes, in render coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HoverUpdate {
    At { x: f32, y: f32 },
    Cleared,
}

/// Everything observers of the ink model are told about.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InkNotification {
    Stroke(StrokeChange),
    Hover(HoverUpdate),
}

/// Assembles strokes from samples.
///
/// A `Begin` only arms the assembler; the stroke is created by the first data
/// sample that follows. `End` carries the last point and closes the stroke.
#[derive(Debug)]
pub struct StrokeAssembler {
    strokes: StrokeCollection,
    expects_new_stroke: bool,
    page: PageContext,
    device_extents: Option<(f32, f32)>,
    surface: Option<(f32, f32)>,
    scale: f32,
    max_pressure: f32,
}

impl Default for StrokeAssembler {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PRESSURE)
    }
}

impl StrokeAssembler {
    pub fn new(max_pressure: f32) -> Self {
        Self {
            strokes: StrokeCollection::new(),
            expects_new_stroke: true,
            page: PageContext::default(),
            device_extents: None,
            surface: None,
            scale: 1.0,
            max_pressure,
        }
    }

    pub fn strokes(&self) -> &StrokeCollection {
        &self.strokes
    }

    pub fn page(&self) -> PageContext {
        self.page
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn max_pressure(&self) -> f32 {
        self.max_pressure
    }

    /// Whether the next data sample will start a new stroke.
    pub fn expects_new_stroke(&self) -> bool {
        self.expects_new_stroke
    }

    /// Overrides the render scale until the next extents or surface change.
    pub fn set_scale(&mut self, scale: f32) {
        if scale.is_finite() && scale > 0.0 {
            self.scale = scale;
        } else {
            debug!("Ignoring invalid ink scale {scale}");
        }
    }

    /// Records the sensor extents and refits the scale to the surface.
    pub fn set_device_extents(&mut self, width: f32, height: f32) {
        self.device_extents = Some((width, height));
        self.refit();
    }

    /// Records a new surface size and refits the scale to the sensor.
    pub fn resize(&mut self, surface_width: f32, surface_height: f32) {
        self.surface = Some((surface_width, surface_height));
        self.refit();
    }

    fn refit(&mut self) {
        if let (Some((dw, dh)), Some((sw, sh))) = (self.device_extents, self.surface) {
            if ![dw, dh, sw, sh].iter().all(|v| v.is_finite() && *v > 0.0) {
                debug!(
                    "Keeping ink scale {:.4}: degenerate extents {dw}x{dh} into {sw}x{sh}",
                    self.scale
                );
                return;
            }
            self.scale = fit_scale(dw, dh, sw, sh);
            debug!("Ink scale refit to {:.4} ({dw}x{dh} into {sw}x{sh})", self.scale);
        }
    }

    /// Applies one sample and returns the resulting notifications in order.
    pub fn apply(&mut self, sample: &RawSample) -> Vec<InkNotification> {
        match sample.phase {
            SamplePhase::Begin => {
                self.expects_new_stroke = true;
                Vec::new()
            }
            SamplePhase::Move | SamplePhase::End => self.apply_data(sample),
            SamplePhase::Hover(phase) => self.apply_hover(phase, sample),
        }
    }

    fn apply_data(&mut self, sample: &RawSample) -> Vec<InkNotification> {
        let decoded = match sample.decode() {
            Ok(decoded) => decoded,
            Err(err) if sample.phase == SamplePhase::End => {
                debug!("Closing stroke without final point: {err}");
                return self.finish_stroke();
            }
            Err(err) => {
                debug!("Dropping sample: {err}");
                return Vec::new();
            }
        };
        let point = Point {
            x: decoded.x * self.scale,
            y: decoded.y * self.scale,
            pressure: normalize_pressure(decoded.pressure.unwrap_or(0.0), self.max_pressure),
        };

        let mut changes = Vec::new();
        if self.expects_new_stroke {
            if let Some(closed) = self.strokes.close() {
                changes.push(StrokeChange::Closed(closed));
            }
            let id = self.strokes.begin(point);
            self.expects_new_stroke = false;
            changes.push(StrokeChange::Started(id));
        } else if let Some((id, index)) = self.strokes.append(point) {
            changes.push(StrokeChange::Appended { id, index });
        } else {
            debug!("Dropping {:?} sample with no open stroke", sample.phase);
            return Vec::new();
        }

        let mut notifications: Vec<InkNotification> =
            changes.into_iter().map(InkNotification::Stroke).collect();
        if sample.phase == SamplePhase::End {
            notifications.extend(self.finish_stroke());
        }
        notifications
    }

    fn finish_stroke(&mut self) -> Vec<InkNotification> {
        self.expects_new_stroke = true;
        self.strokes
            .close()
            .map(|id| InkNotification::Stroke(StrokeChange::Closed(id)))
            .into_iter()
            .collect()
    }

    fn apply_hover(&mut self, phase: HoverPhase, sample: &RawSample) -> Vec<InkNotification> {
        let update = match phase {
            HoverPhase::Begin | HoverPhase::Move => match sample.decode() {
                Ok(decoded) => HoverUpdate::At {
                    x: decoded.x * self.scale,
                    y: decoded.y * self.scale,
                },
                Err(err) => {
                    debug!("Dropping hover sample: {err}");
                    return Vec::new();
                }
            },
            HoverPhase::End => HoverUpdate::Cleared,
        };
        vec![InkNotification::Hover(update)]
    }

    /// Clears all strokes for a new page.
    pub fn new_page(&mut self) -> Vec<InkNotification> {
        self.reset_page()
    }

    /// Clears all strokes for a new layer. Layers are not kept separately.
    pub fn new_layer(&mut self) -> Vec<InkNotification> {
        self.reset_page()
    }

    fn reset_page(&mut self) -> Vec<InkNotification> {
        self.strokes.clear();
        self.expects_new_stroke = true;
        self.page = PageContext(self.page.0 + 1);
        vec![InkNotification::Stroke(StrokeChange::Cleared)]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn begin() -> RawSample {
        RawSample::new(SamplePhase::Begin, Vec::new())
    }

    fn data(phase: SamplePhase, x: f32, y: f32, pressure: f32) -> RawSample {
        RawSample::point(phase, x, y, pressure)
    }

    fn feed(assembler: &mut StrokeAssembler, samples: &[RawSample]) -> Vec<InkNotification> {
        samples
            .iter()
            .flat_map(|sample| assembler.apply(sample))
            .collect()
    }

    #[test]
    fn begin_move_move_end_builds_one_closed_stroke() {
        let mut assembler = StrokeAssembler::default();
        feed(
            &mut assembler,
            &[
                begin(),
                data(SamplePhase::Move, 1.0, 1.0, 1.1),
                data(SamplePhase::Move, 2.0, 2.0, 1.2),
                data(SamplePhase::End, 3.0, 3.0, 1.3),
            ],
        );

        let strokes = assembler.strokes();
        assert_eq!(strokes.len(), 1);
        let stroke = strokes.iter().next().unwrap();
        assert_eq!(stroke.len(), 3);
        assert!(stroke.is_closed());
        assert!(assembler.expects_new_stroke());
    }

    #[test]
    fn begin_alone_creates_nothing() {
        let mut assembler = StrokeAssembler::default();
        assert!(assembler.apply(&begin()).is_empty());
        assert!(assembler.strokes().is_empty());
    }

    #[test]
    fn one_stroke_per_armed_arrival() {
        let mut assembler = StrokeAssembler::default();
        for i in 0..4 {
            feed(
                &mut assembler,
                &[
                    begin(),
                    data(SamplePhase::Move, i as f32, 0.0, 1.2),
                    data(SamplePhase::End, i as f32, 1.0, 1.2),
                ],
            );
        }
        assert_eq!(assembler.strokes().len(), 4);
        assert!(assembler.strokes().iter().all(|s| s.is_closed()));
    }

    #[test]
    fn scaled_point_with_zero_pressure() {
        let mut assembler = StrokeAssembler::default();
        assembler.set_scale(0.5);
        feed(
            &mut assembler,
            &[begin(), data(SamplePhase::End, 100.0, 200.0, 1.0)],
        );

        let strokes = assembler.strokes();
        assert_eq!(strokes.len(), 1);
        let stroke = strokes.iter().next().unwrap();
        assert_eq!(
            stroke.points(),
            &[Point {
                x: 50.0,
                y: 100.0,
                pressure: 0.0
            }]
        );
        assert!(stroke.is_closed());
    }

    #[test]
    fn notifications_follow_mutations() {
        let mut assembler = StrokeAssembler::default();
        let changes = feed(
            &mut assembler,
            &[
                begin(),
                data(SamplePhase::Move, 1.0, 1.0, 1.1),
                data(SamplePhase::End, 2.0, 2.0, 1.1),
            ],
        );
        let id = assembler.strokes().iter().next().unwrap().id();
        assert_eq!(
            changes,
            vec![
                InkNotification::Stroke(StrokeChange::Started(id)),
                InkNotification::Stroke(StrokeChange::Appended { id, index: 1 }),
                InkNotification::Stroke(StrokeChange::Closed(id)),
            ]
        );
    }

    #[test]
    fn end_without_data_closes_open_stroke() {
        let mut assembler = StrokeAssembler::default();
        assembler.set_scale(0.5);
        feed(
            &mut assembler,
            &[
                begin(),
                data(SamplePhase::Move, 100.0, 200.0, 1.0),
                RawSample::new(SamplePhase::End, Vec::new()),
            ],
        );
        let stroke = assembler.strokes().iter().next().unwrap();
        assert_eq!(stroke.len(), 1);
        assert_eq!(stroke.points()[0].x, 50.0);
        assert!(stroke.is_closed());
        assert!(assembler.expects_new_stroke());
    }

    #[test]
    fn data_after_end_starts_new_stroke() {
        let mut assembler = StrokeAssembler::default();
        feed(
            &mut assembler,
            &[begin(), data(SamplePhase::End, 1.0, 1.0, 1.2)],
        );
        // End re-arms, so the next data sample opens a new stroke.
        let changes = assembler.apply(&data(SamplePhase::Move, 2.0, 2.0, 1.2));
        assert_eq!(changes.len(), 1);
        assert_eq!(assembler.strokes().len(), 2);
        assert!(assembler.strokes().iter().next().unwrap().is_closed());
    }

    #[test]
    fn closed_strokes_never_grow() {
        let mut assembler = StrokeAssembler::default();
        feed(
            &mut assembler,
            &[begin(), data(SamplePhase::End, 1.0, 1.0, 1.2)],
        );
        let before = assembler.strokes().point_count();
        assert!(assembler.strokes().open_stroke().is_none());
        feed(&mut assembler, &[begin()]);
        assert_eq!(assembler.strokes().point_count(), before);
    }

    #[test]
    fn begin_while_open_closes_previous_stroke() {
        let mut assembler = StrokeAssembler::default();
        let changes = feed(
            &mut assembler,
            &[
                begin(),
                data(SamplePhase::Move, 1.0, 1.0, 1.2),
                begin(),
                data(SamplePhase::Move, 5.0, 5.0, 1.2),
            ],
        );
        assert_eq!(assembler.strokes().len(), 2);
        let first = assembler.strokes().iter().next().unwrap();
        assert!(first.is_closed());
        assert!(changes.contains(&InkNotification::Stroke(StrokeChange::Closed(first.id()))));
    }

    #[test]
    fn malformed_samples_are_dropped() {
        let mut assembler = StrokeAssembler::default();
        assembler.apply(&begin());
        let changes = assembler.apply(&RawSample::new(SamplePhase::Move, vec![1.0, 2.0]));
        assert!(changes.is_empty());
        assert!(assembler.strokes().is_empty());
        assert!(assembler.expects_new_stroke());
    }

    #[test]
    fn pressure_is_normalized() {
        let mut assembler = StrokeAssembler::new(2.0);
        feed(
            &mut assembler,
            &[
                begin(),
                data(SamplePhase::Move, 0.0, 0.0, 1.5),
                data(SamplePhase::End, 0.0, 0.0, 9.0),
            ],
        );
        let pressures: Vec<f32> = assembler
            .strokes()
            .iter()
            .flat_map(|s| s.points().iter().map(|p| p.pressure))
            .collect();
        assert_eq!(pressures, vec![0.5, 1.0]);
    }

    #[test]
    fn hover_leaves_strokes_untouched() {
        let mut assembler = StrokeAssembler::default();
        assembler.set_scale(2.0);
        let moved = assembler.apply(&RawSample::new(
            SamplePhase::Hover(HoverPhase::Move),
            vec![3.0, 4.0],
        ));
        assert_eq!(
            moved,
            vec![InkNotification::Hover(HoverUpdate::At { x: 6.0, y: 8.0 })]
        );
        let ended = assembler.apply(&RawSample::new(
            SamplePhase::Hover(HoverPhase::End),
            Vec::new(),
        ));
        assert_eq!(ended, vec![InkNotification::Hover(HoverUpdate::Cleared)]);
        assert!(assembler.strokes().is_empty());
    }

    #[test]
    fn new_page_clears_and_rearms() {
        let mut assembler = StrokeAssembler::default();
        feed(
            &mut assembler,
            &[begin(), data(SamplePhase::Move, 1.0, 1.0, 1.2)],
        );
        assert!(!assembler.expects_new_stroke());

        let changes = assembler.new_page();
        assert_eq!(changes, vec![InkNotification::Stroke(StrokeChange::Cleared)]);
        assert!(assembler.strokes().is_empty());
        assert!(assembler.expects_new_stroke());
        assert_eq!(assembler.page().value(), 1);

        assembler.new_layer();
        assert_eq!(assembler.page().value(), 2);

        assembler.apply(&data(SamplePhase::Move, 2.0, 2.0, 1.2));
        let id = assembler.strokes().iter().next().unwrap().id();
        assert_eq!(id.value(), 1);
    }

    #[test]
    fn resize_refits_scale() {
        let mut assembler = StrokeAssembler::default();
        assembler.resize(1000.0, 500.0);
        assert_eq!(assembler.scale(), 1.0);
        assembler.set_device_extents(2000.0, 2000.0);
        assert!((assembler.scale() - 0.25).abs() < 1e-6);
        assembler.resize(4000.0, 4000.0);
        assert!((assembler.scale() - 2.0).abs() < 1e-6);
    }

    #[test]
    fn collapsed_surface_keeps_previous_scale() {
        let mut assembler = StrokeAssembler::default();
        assembler.set_device_extents(21000.0, 14800.0);
        assembler.resize(1024.0, 768.0);
        let scale = assembler.scale();
        assert!(scale < 0.1);

        assembler.resize(0.0, 0.0);
        assert_eq!(assembler.scale(), scale);

        feed(
            &mut assembler,
            &[begin(), data(SamplePhase::End, 21000.0, 14800.0, 1.0)],
        );
        let point = assembler.strokes().iter().next().unwrap().points()[0];
        assert!(point.x < 1025.0);

        assembler.resize(2048.0, 1536.0);
        assert!((assembler.scale() - scale * 2.0).abs() < 1e-6);
    }

    #[test]
    fn invalid_scale_is_ignored() {
        let mut assembler = StrokeAssembler::default();
        assembler.set_scale(f32::NAN);
        assembler.set_scale(-1.0);
        assert_eq!(assembler.scale(), 1.0);
    }
}
