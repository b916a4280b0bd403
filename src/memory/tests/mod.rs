mod location_set_tests;
