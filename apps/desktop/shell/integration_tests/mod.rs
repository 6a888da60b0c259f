mod startup_tests {
    mod helpers;
    mod startup;
}
