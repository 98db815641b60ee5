mod test_heartbeat_only_while_playing;
mod test_host_commands;
mod test_initial_state_waits_for_player;
mod test_notice_burst_applies_last;
mod test_viewer_converges_after_debounce;
