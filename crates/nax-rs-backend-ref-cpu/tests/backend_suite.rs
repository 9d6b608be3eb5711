use nax_rs_backend_ref_cpu::CpuBackend;
use nax_rs_backend_tests::define_backend_tests;

define_backend_tests!(cpu_backend, CpuBackend::new);
