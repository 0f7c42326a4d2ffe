use super::event::Event;

/// Transforms an event before any distance computation sees it.
/// Registered on a driver and applied exactly once per event, in
/// registration order.
pub trait Preprocess<const D: usize>: Send + Sync {
    fn transform(&self, event: Event<D>) -> Event<D>;
}

/// Recenter every particle on the event's weighted centroid, leaving
/// weights untouched. Standard first step when only the shape of an
/// event should matter, not where it happened.
#[derive(Debug, Default, Clone, Copy)]
pub struct Center;

impl<const D: usize> Preprocess<D> for Center {
    fn transform(&self, event: Event<D>) -> Event<D> {
        let ref centroid = event.centroid();
        event.map(|p| p.translate(centroid))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recentered_events_have_zero_centroid() {
        let event = Event::from(vec![(1., [5., -2.]), (2., [8., 4.]), (1., [1., 1.])]);
        let centered = Center.transform(event);
        let [x, y] = centered.centroid();
        assert!(x.abs() < 1e-12);
        assert!(y.abs() < 1e-12);
    }

    #[test]
    fn recentering_preserves_weights() {
        let event = Event::from(vec![(1., [5.]), (2., [8.])]);
        let centered = Center.transform(event.clone());
        assert_eq!(centered.total(), event.total());
        assert_eq!(centered.n(), event.n());
    }

    #[test]
    fn recentering_empty_event_is_a_noop() {
        let event = Event::<3>::default();
        let centered = Center.transform(event.clone());
        assert_eq!(centered, event);
    }
}
