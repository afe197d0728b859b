use crate::WebViewer;
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use wasm_bindgen::closure::Closure;
use wasm_bindgen::JsCast;
use web_sys as web;

type Tick = Rc<RefCell<Option<Closure<dyn FnMut()>>>>;

/// Self-rescheduling `requestAnimationFrame` loop driving one viewer.
pub struct RenderLoop {
    running: Rc<Cell<bool>>,
    pending: Rc<Cell<Option<i32>>>,
    tick: Tick,
}

impl RenderLoop {
    pub fn start(viewer: WebViewer) -> Self {
        let running = Rc::new(Cell::new(true));
        let pending: Rc<Cell<Option<i32>>> = Rc::new(Cell::new(None));
        let tick: Tick = Rc::new(RefCell::new(None));

        let tick_next = tick.clone();
        let running_tick = running.clone();
        let pending_tick = pending.clone();
        *tick.borrow_mut() = Some(Closure::wrap(Box::new(move || {
            pending_tick.set(None);
            if !running_tick.get() {
                return;
            }
            // Errors stay inside the loop; the next frame tries again.
            if let Err(e) = viewer.frame() {
                log::error!("[frame] render error: {}", e);
            }
            if let Some(closure) = tick_next.borrow().as_ref() {
                pending_tick.set(schedule(closure));
            }
        }) as Box<dyn FnMut()>));

        if let Some(closure) = tick.borrow().as_ref() {
            pending.set(schedule(closure));
        }
        log::info!("[frame] render loop started");
        Self {
            running,
            pending,
            tick,
        }
    }

    /// Cancel the pending frame and release the loop closure.
    pub fn stop(&self) {
        if !self.running.replace(false) {
            return;
        }
        if let (Some(id), Some(w)) = (self.pending.take(), web::window()) {
            _ = w.cancel_animation_frame(id);
        }
        // breaks the closure -> tick reference cycle
        self.tick.borrow_mut().take();
        log::info!("[frame] render loop stopped");
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

fn schedule(closure: &Closure<dyn FnMut()>) -> Option<i32> {
    web::window().and_then(|w| w.request_animation_frame(closure.as_ref().unchecked_ref()).ok())
}
