// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The contract between the dispatch engine and a collection of stylus plugins.

use kurbo::Point;

use crate::input::{CustomData, RawStylusInput};
use crate::types::StylusAction;

/// A set of stylus plugins attached to one visual-tree node.
///
/// How plugins inside the collection process points is entirely up to the
/// implementation. The engine only promises ordering: for one dispatch,
/// leave on the previous target comes first, then enter, then raw input, then
/// custom data.
///
/// Notifications carry a `confirmed` flag. Confirmed notifications are
/// delivered exactly once per transition. Unconfirmed ones are best-effort
/// corrections sent when an earlier, faster dispatch picked the wrong target.
///
/// Errors are not handled by the engine. They abort the dispatch and are
/// returned to its caller, wrapped in
/// [`DispatchError::Plugin`](crate::DispatchError::Plugin).
pub trait PluginCollection {
    /// Error reported by notification handlers.
    type Error;

    /// Data plugins attach to payloads with
    /// [`RawStylusInput::notify_when_processed`].
    type CustomData;

    /// Whether `point`, in the collection's element space, hits the collection.
    fn hit_test(&self, point: Point) -> bool;

    /// The stylus entered (`entering == true`) or left the collection.
    fn on_enter_leave(
        &mut self,
        entering: bool,
        input: &RawStylusInput<Self::CustomData>,
        confirmed: bool,
    ) -> Result<(), Self::Error>;

    /// Packet data addressed to the collection.
    ///
    /// Plugins may correct points with [`RawStylusInput::set_points`]; the
    /// correction is copied back into the canonical report.
    fn on_raw_input(
        &mut self,
        input: &mut RawStylusInput<Self::CustomData>,
    ) -> Result<(), Self::Error>;

    /// Custom data attached by plugin `data.owner` has been processed.
    fn on_custom_data(
        &mut self,
        data: &CustomData<Self::CustomData>,
        action: StylusAction,
        confirmed: bool,
    ) -> Result<(), Self::Error>;
}

#[cfg(test)]
pub(crate) mod recording {
    //! A plugin collection that records every notification into a shared log.

    use super::PluginCollection;
    use crate::input::{CustomData, RawStylusInput};
    use crate::types::StylusAction;
    use alloc::rc::Rc;
    use alloc::vec::Vec;
    use core::cell::RefCell;
    use kurbo::{Point, Rect, Vec2};

    #[derive(Clone, Debug, PartialEq)]
    pub(crate) enum Call {
        Enter(&'static str, bool),
        Leave(&'static str, bool),
        Raw(&'static str, Vec<Point>),
        Custom(&'static str, u32, StylusAction, bool),
    }

    pub(crate) type Log = Rc<RefCell<Vec<Call>>>;

    #[derive(Debug, thiserror::Error)]
    #[error("plugin collection {0} failed")]
    pub(crate) struct Failed(pub(crate) &'static str);

    #[derive(Debug)]
    pub(crate) struct Recorder {
        pub(crate) name: &'static str,
        pub(crate) bounds: Rect,
        pub(crate) log: Log,
        /// Custom data attached on every raw input.
        pub(crate) attach: Option<u32>,
        /// Offset applied to every point on raw input.
        pub(crate) shift: Option<Vec2>,
        pub(crate) fail_on_enter: bool,
    }

    impl Recorder {
        pub(crate) fn new(name: &'static str, bounds: Rect, log: &Log) -> Self {
            Self {
                name,
                bounds,
                log: log.clone(),
                attach: None,
                shift: None,
                fail_on_enter: false,
            }
        }
    }

    impl PluginCollection for Recorder {
        type Error = Failed;
        type CustomData = u32;

        fn hit_test(&self, point: Point) -> bool {
            self.bounds.contains(point)
        }

        fn on_enter_leave(
            &mut self,
            entering: bool,
            _input: &RawStylusInput<u32>,
            confirmed: bool,
        ) -> Result<(), Failed> {
            if entering && self.fail_on_enter {
                return Err(Failed(self.name));
            }
            let call = if entering {
                Call::Enter(self.name, confirmed)
            } else {
                Call::Leave(self.name, confirmed)
            };
            self.log.borrow_mut().push(call);
            Ok(())
        }

        fn on_raw_input(&mut self, input: &mut RawStylusInput<u32>) -> Result<(), Failed> {
            self.log
                .borrow_mut()
                .push(Call::Raw(self.name, input.points()));
            if let Some(shift) = self.shift {
                let moved: Vec<Point> = input.points().into_iter().map(|p| p + shift).collect();
                input.set_points(&moved);
            }
            if let Some(data) = self.attach {
                input.notify_when_processed(0, data);
            }
            Ok(())
        }

        fn on_custom_data(
            &mut self,
            data: &CustomData<u32>,
            action: StylusAction,
            confirmed: bool,
        ) -> Result<(), Failed> {
            self.log
                .borrow_mut()
                .push(Call::Custom(self.name, data.data, action, confirmed));
            Ok(())
        }
    }
}
