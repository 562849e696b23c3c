use native_bridge_testing::{init_tracing, run_test};

mod disposal;
mod events;
mod owner_thread;
mod threads;

fn main() {
    init_tracing();

    // Handle identity
    run_test("registry::lookup_returns_same_wrapper", registry::test_lookup_returns_same_wrapper);
    run_test("registry::reissued_handle", registry::test_reissued_handle_resolves_to_new_wrapper);
    run_test("registry::collected_wrapper", registry::test_collected_wrapper_is_not_found);
    run_test("registry::secondary_index", registry::test_secondary_index_follows_primary);
    run_test("registry::audio_device_ids", registry::test_audio_device_ids);
    run_test("registry::shared_open", registry::test_shared_open_yields_existing_wrapper);
    run_test("registry::reissued_live_handle", registry::test_reissued_live_handle_is_refused);

    // Disposal protocol
    run_test("disposal::dispose_twice", disposal::test_dispose_twice_releases_once);
    run_test("disposal::finalize_once", disposal::test_finalize_releases_once);
    run_test("disposal::use_after_release", disposal::test_use_after_release_makes_no_native_calls);
    run_test("disposal::construction_failure", disposal::test_construction_failure_registers_nothing);
    run_test("disposal::window_releases_renderers", disposal::test_window_releases_renderers_first);
    run_test("disposal::texture_before_renderer", disposal::test_texture_disposed_before_renderer);
    run_test("disposal::texture_info", disposal::test_texture_info_is_cached);
    run_test("disposal::generic_open", disposal::test_generic_open);
    run_test("disposal::forwarded_calls", disposal::test_forwarded_calls_reach_native);

    // Trampolines
    run_test("trampolines::io_read_fault", trampolines::test_io_read_fault_returns_sentinel);
    run_test("trampolines::io_cursor", trampolines::test_io_cursor_source);
    run_test("trampolines::io_bad_ranges", trampolines::test_io_rejects_bad_ranges);
    run_test("trampolines::io_close", trampolines::test_io_close_releases_then_reports);
    run_test("trampolines::io_drop", trampolines::test_io_drop_frees_native_object);
    run_test("trampolines::io_unknown", trampolines::test_io_unknown_context);
    run_test("trampolines::hit_test", trampolines::test_hit_test);
    run_test("trampolines::hit_test_unknown", trampolines::test_hit_test_unknown_window);
    run_test("trampolines::timer_runs_until_zero", trampolines::test_timer_runs_until_zero);
    run_test("trampolines::timer_dispose", trampolines::test_timer_dispose_removes_native_timer);
    run_test("trampolines::timer_fault", trampolines::test_timer_fault_cancels);
    run_test("trampolines::timer_unknown", trampolines::test_timer_unknown_token);
    run_test("trampolines::log_handler", trampolines::test_log_handler);
    run_test("trampolines::log_forwarding", trampolines::test_log_forwarding_follows_config);

    // Event demultiplexer
    run_test("events::window_routing", events::test_window_event_routes_by_id);
    run_test("events::empty_queue", events::test_pump_on_empty_queue);
    run_test("events::no_runtime", events::test_pump_without_runtime);
    run_test("events::global_and_device_added", events::test_global_and_device_added);
    run_test("events::device_routes", events::test_joystick_and_controller_routes);
    run_test("events::touch", events::test_touch_route);
    run_test("events::audio_device", events::test_audio_device_route);
    run_test("events::dispose_in_handler", events::test_handler_disposing_its_window);
    run_test("events::stale_event", events::test_stale_event_not_delivered_to_recycled_handle);
    run_test("events::finalized_target", events::test_finalized_target_retires_route);

    // Runtime and owner thread
    run_test("owner_thread::inline", owner_thread::test_run_on_owner_thread_inline);
    run_test("owner_thread::foreign_thread", owner_thread::test_foreign_thread_task_runs_during_pump);
    run_test("owner_thread::install_twice", owner_thread::test_install_twice_fails);
    run_test("owner_thread::after_shutdown", owner_thread::test_wrappers_outlive_runtime);

    // Releases and callbacks on other threads
    run_test("threads::concurrent_dispose", threads::test_concurrent_dispose_releases_once);
    run_test("threads::concurrent_finalizers", threads::test_concurrent_finalizers_release_once);
    run_test("threads::foreign_release", threads::test_foreign_release_leaves_native_queue_to_owner);
    run_test("threads::pump_settles_release", threads::test_pump_settles_foreign_release);
    run_test("threads::timer_races_dispose", threads::test_timer_expiry_races_dispose);
    run_test("threads::hit_test_races_dispose", threads::test_hit_test_races_dispose);

    println!("\nall main-thread tests passed");
}
