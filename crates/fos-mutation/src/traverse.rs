//! Tree traversal helpers

/// Depth-first post-order over the subtree at `root`: children left to
/// right, then the node itself.
///
/// Iterative, so deep detached subtrees cannot overflow the stack.
pub(crate) fn post_order<T, F>(root: T, mut children: F) -> Vec<T>
where
    T: Copy,
    F: FnMut(T) -> Vec<T>,
{
    let mut order = Vec::new();
    let mut stack = vec![(root, false)];
    while let Some((node, expanded)) = stack.pop() {
        if expanded {
            order.push(node);
            continue;
        }
        stack.push((node, true));
        for child in children(node).into_iter().rev() {
            stack.push((child, false));
        }
    }
    order
}
