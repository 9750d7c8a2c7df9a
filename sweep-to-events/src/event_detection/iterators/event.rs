use super::Detector;

/// Drives a [Detector] over a source iterator, yielding each event it emits
/// and, once the source is exhausted, whatever [Detector::finish] returns.
#[derive(Clone)]
pub struct EventIter<I, D>
where
    I: Iterator<Item = (D::TimeType, D::ValueType)>,
    D: Detector,
{
    source: I,
    detector: D,
    finished: bool,
}

impl<I, D> Iterator for EventIter<I, D>
where
    I: Iterator<Item = (D::TimeType, D::ValueType)>,
    D: Detector,
{
    type Item = D::EventType;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        for (time, value) in &mut self.source {
            if let Some(event) = self.detector.signal(time, value) {
                return Some(event);
            }
        }
        self.finished = true;
        self.detector.finish()
    }
}

pub trait EventFilter<I, D>
where
    I: Iterator<Item = (D::TimeType, D::ValueType)>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D>;
}

impl<I, D> EventFilter<I, D> for I
where
    I: Iterator<Item = (D::TimeType, D::ValueType)>,
    D: Detector,
{
    fn events(self, detector: D) -> EventIter<I, D> {
        EventIter {
            source: self,
            detector,
            finished: false,
        }
    }
}
