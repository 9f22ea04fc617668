use super::*;

#[test]
fn offset_keeps_child_length() {
    let child = Coords::xys(1.0, 2.0, 3.0);
    let parent = Coords::xy(10.0, 20.0);
    assert_eq!(child.offset_by(&parent), Coords::xys(11.0, 22.0, 3.0));

    let short = Coords::xy(1.0, 1.0);
    let long_parent = Coords::xys(5.0, 5.0, 5.0);
    assert_eq!(short.offset_by(&long_parent), Coords::xy(6.0, 6.0));
}

#[test]
fn missing_components_read_as_zero() {
    let c = Coords::xy(3.0, 4.0);
    assert_eq!(c.extent(), 0.0);
    assert_eq!(c.point(), Point::new(3.0, 4.0));
    assert_eq!(c.scaled(2.0), Coords::xy(6.0, 8.0));
}

#[test]
fn wall_clock_is_after_epoch() {
    assert!(now_secs() > 1.0e9);
}
