mod hot_reload_tests;
