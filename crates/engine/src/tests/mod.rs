mod read_tests;
