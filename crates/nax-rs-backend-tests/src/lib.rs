pub mod conformance;
pub mod recording_backend;

pub use recording_backend::RecordingBackend;

#[macro_export]
macro_rules! define_backend_tests {
    ($module:ident, $backend_ctor:expr) => {
        #[cfg(test)]
        mod $module {
            use super::*;
            use $crate::conformance;

            macro_rules! conformance_test {
                ($name:ident) => {
                    #[test]
                    fn $name() {
                        let backend = ($backend_ctor)();
                        conformance::$name(&backend);
                    }
                };
            }

            conformance_test!(trace_matches_positional_diagonal);
            conformance_test!(trace_keeps_remaining_axes);
            conformance_test!(where_selects_elementwise);
            conformance_test!(where_indices_list_true_coordinates);
            conformance_test!(clip_broadcasts_bounds);
            conformance_test!(tril_and_triu_partition_the_plane);
            conformance_test!(isclose_is_reflexive);
            conformance_test!(pad_left_prepends_fill);
            conformance_test!(pad_edge_mode_repeats_border);
            conformance_test!(add_rejects_disjoint_axes);

            #[test]
            fn recording_wrapper_forwards_results() {
                let backend = $crate::RecordingBackend::new(($backend_ctor)());
                conformance::trace_matches_positional_diagonal(&backend);
                assert!(backend.called("trace"));
            }
        }
    };
}
