#![allow(dead_code)]

use rstest::fixture;
use stlmilp::stl::{Formula, Signal, TimeInterval};

// ---
// Formula Fixtures
// ---

pub fn gt(threshold: f64) -> Formula {
    Formula::predicate(Signal::greater_than("x", threshold))
}

pub fn lt(threshold: f64) -> Formula {
    Formula::predicate(Signal::less_than("x", threshold))
}

pub fn interval(start: f64, end: f64) -> TimeInterval {
    TimeInterval::new(start, end).unwrap()
}

#[fixture]
pub fn scenario_formula() -> Formula {
    // G[0,100](x < 50) && F[0,50](G[0,10](!(x < 5) && x < 10))
    let band = Formula::and(vec![Formula::not(lt(5.0)), lt(10.0)]).unwrap();
    Formula::and(vec![
        Formula::always(interval(0.0, 100.0), lt(50.0)),
        Formula::eventually(interval(0.0, 50.0), Formula::always(interval(0.0, 10.0), band)),
    ])
    .unwrap()
}

#[fixture]
pub fn nested_and_or() -> Formula {
    // (x > 2.5 && x < 5.5) || (x > 5.5 && !(x > 7.5))
    Formula::or(vec![
        Formula::and(vec![gt(2.5), lt(5.5)]).unwrap(),
        Formula::and(vec![gt(5.5), Formula::not(gt(7.5))]).unwrap(),
    ])
    .unwrap()
}

#[fixture]
pub fn shared_predicate() -> Formula {
    // The same `x > 4.5` node appears under both branches.
    let p = gt(4.5);
    Formula::or(vec![
        Formula::and(vec![p.clone(), lt(5.5)]).unwrap(),
        Formula::not(p),
    ])
    .unwrap()
}

#[fixture]
pub fn until_formula() -> Formula {
    // (x > 1.5) U[1,3] (x > 4.5)
    Formula::until(interval(1.0, 3.0), gt(1.5), gt(4.5))
}
