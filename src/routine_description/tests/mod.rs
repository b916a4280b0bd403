mod names_tests;
