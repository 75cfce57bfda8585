//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;

use std::cell::RefCell;
use std::rc::Rc;

use replay_rs::Vec3;

/// Values collected by a replay sink
pub type Captured<R> = Rc<RefCell<Vec<R>>>;

/// A sink closure that pushes every value into `captured`
pub fn collecting_sink<R: 'static>(captured: &Captured<R>) -> impl FnMut(R) + 'static {
    let out = Rc::clone(captured);
    move |value| out.borrow_mut().push(value)
}

/// Frame `i` of a straight-line test path
pub fn path_frame(i: usize) -> Vec3 {
    Vec3::new(i as f32, i as f32 * 2.0, -(i as f32))
}

/// Assert two floats are approximately equal
pub fn assert_float_eq(a: f64, b: f64, epsilon: f64) {
    assert!(
        (a - b).abs() < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}

/// Assert two vectors are approximately equal component-wise
pub fn assert_vec3_eq(a: Vec3, b: Vec3, epsilon: f32) {
    assert!(
        a.distance(&b) < epsilon,
        "Expected {} to be approximately equal to {} (epsilon: {})",
        a,
        b,
        epsilon
    );
}
