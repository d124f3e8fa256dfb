//! Z-order (paint order) over canvas elements.
//!
//! Paint order is defined by `z_index` alone; the position of an element in
//! the backing collection only breaks ties (stable sort). Reordering swaps
//! z-index values between neighbours instead of renumbering, so elements not
//! involved keep their values.

use crate::{Element, ElementId};

/// Elements sorted ascending by z-index, ties in insertion order.
#[must_use]
pub fn render_order(elements: &[Element]) -> Vec<&Element> {
    let mut sorted: Vec<&Element> = elements.iter().collect();
    sorted.sort_by_key(|e| e.transform.z_index);
    sorted
}

/// Highest z-index in use, if any.
#[must_use]
pub fn max_z(elements: &[Element]) -> Option<i32> {
    elements.iter().map(|e| e.transform.z_index).max()
}

/// Lowest z-index in use, if any.
#[must_use]
pub fn min_z(elements: &[Element]) -> Option<i32> {
    elements.iter().map(|e| e.transform.z_index).min()
}

/// Z-index that paints above everything currently present.
#[must_use]
pub fn next_z(elements: &[Element]) -> i32 {
    max_z(elements).map_or(0, |z| z.saturating_add(1))
}

/// Indices into `elements` in render order.
fn ranked(elements: &[Element]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..elements.len()).collect();
    order.sort_by_key(|&i| elements[i].transform.z_index);
    order
}

fn position(elements: &[Element], id: &ElementId) -> Option<usize> {
    elements.iter().position(|e| &e.id == id)
}

/// Pair of collection indices (target, neighbour) for a one-step move.
fn neighbour(elements: &[Element], id: &ElementId, up: bool) -> Option<(usize, usize)> {
    let target = position(elements, id)?;
    let order = ranked(elements);
    let rank = order.iter().position(|&i| i == target)?;
    let other = if up {
        *order.get(rank + 1)?
    } else {
        *order.get(rank.checked_sub(1)?)?
    };
    Some((target, other))
}

/// Whether [`move_up`] would change anything.
#[must_use]
pub fn can_move_up(elements: &[Element], id: &ElementId) -> bool {
    neighbour(elements, id, true).is_some()
}

/// Whether [`move_down`] would change anything.
#[must_use]
pub fn can_move_down(elements: &[Element], id: &ElementId) -> bool {
    neighbour(elements, id, false).is_some()
}

/// Paint the element above everything else. Returns false if not found.
pub fn bring_to_front(elements: &mut [Element], id: &ElementId) -> bool {
    let Some(top) = max_z(elements) else {
        return false;
    };
    match elements.iter_mut().find(|e| &e.id == id) {
        Some(element) => {
            element.transform.z_index = top.saturating_add(1);
            true
        }
        None => false,
    }
}

/// Paint the element below everything else. Returns false if not found.
pub fn send_to_back(elements: &mut [Element], id: &ElementId) -> bool {
    let Some(bottom) = min_z(elements) else {
        return false;
    };
    match elements.iter_mut().find(|e| &e.id == id) {
        Some(element) => {
            element.transform.z_index = bottom.saturating_sub(1);
            true
        }
        None => false,
    }
}

fn swap_with_neighbour(elements: &mut [Element], id: &ElementId, up: bool) -> bool {
    let Some((a, b)) = neighbour(elements, id, up) else {
        return false;
    };
    let za = elements[a].transform.z_index;
    elements[a].transform.z_index = elements[b].transform.z_index;
    elements[b].transform.z_index = za;
    true
}

/// Swap z-index with the next element up. No-op (false) at the top.
pub fn move_up(elements: &mut [Element], id: &ElementId) -> bool {
    swap_with_neighbour(elements, id, true)
}

/// Swap z-index with the next element down. No-op (false) at the bottom.
pub fn move_down(elements: &mut [Element], id: &ElementId) -> bool {
    swap_with_neighbour(elements, id, false)
}
